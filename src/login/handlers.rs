//! Handlers for the three-step login handshake.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::login::provider::ProviderParams;
use crate::login::session::Session;
use crate::login::{LoginState, LANDING_PATH, WELCOME_PATH};
use crate::observability::metrics;

pub const LOGIN_FAILED: &str = "Failed to log in, bad details provided.";

#[derive(Debug, Default, Deserialize)]
pub struct LandingParams {
    pub login: Option<String>,
    pub logout: Option<String>,
}

/// Entry point: greet a signed-in user, start a login, or offer one.
pub async fn landing(
    State(state): State<LoginState>,
    session: Session,
    params: Result<Query<LandingParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let login = parse_flag("login", params.login.as_deref())?;
    let logout = parse_flag("logout", params.logout.as_deref())?;

    let steam_id = if logout {
        session.clear();
        tracing::info!("Session cleared");
        None
    } else {
        session.steam_id()
    };

    if let Some(steam_id) = steam_id {
        return Ok(Html(landing_page(&steam_id)).into_response());
    }

    if login {
        let url = state.provider.authorization_url();
        tracing::debug!(provider = %url.origin().ascii_serialization(), "Redirecting to identity provider");
        return Ok(Redirect::to(url.as_str()).into_response());
    }

    Ok(Html(login_prompt_page()).into_response())
}

/// Provider callback. Verification failures never touch the session.
pub async fn process(
    State(state): State<LoginState>,
    session: Session,
    Query(params): Query<ProviderParams>,
) -> Response {
    match state.provider.verify(&params).await {
        Ok(steam_id) => {
            session.set_steam_id(&steam_id);
            metrics::record_login("success");
            tracing::info!(steam_id = %steam_id, "Login verified");
            Redirect::to(WELCOME_PATH).into_response()
        }
        Err(e) => {
            metrics::record_login("failure");
            tracing::warn!(error = %e, "Login verification failed");
            Html(LOGIN_FAILED).into_response()
        }
    }
}

pub async fn welcome(session: Session) -> Response {
    match session.steam_id() {
        Some(steam_id) => Html(format!("<h1>Hello {}!</h1>", escape_html(&steam_id))).into_response(),
        None => Redirect::to(LANDING_PATH).into_response(),
    }
}

fn landing_page(steam_id: &str) -> String {
    format!(
        "<h1>Welcome, {}</h1><p><a href=\"{LANDING_PATH}?logout=true\">Logout</a></p>",
        escape_html(steam_id)
    )
}

fn login_prompt_page() -> String {
    format!("<p><a href=\"{LANDING_PATH}?login=true\">Login with Steam</a></p>")
}

/// Lenient boolean as browsers and scripts tend to send it.
pub fn parse_flag(name: &str, value: Option<&str>) -> Result<bool, ApiError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ApiError::BadRequest(format!(
            "{name}: '{value}' is not a boolean"
        ))),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
