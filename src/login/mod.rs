//! Experimental third-party identity login.
//!
//! # State Machine
//! ```text
//! anonymous ──landing?login=true──▶ redirected-to-provider
//!     ▲                                   │ provider calls /process
//!     │                                   ▼
//!     └──────landing?logout=true───── authenticated (steam_id in cookie)
//! ```
//!
//! # Design Decisions
//! - Each step is its own request; the encrypted cookie is the only state
//! - A failed callback leaves the session untouched and answers 200
//! - The cookie key comes from configuration; there is no fallback key

pub mod handlers;
pub mod provider;
pub mod session;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use tower_cookies::CookieManagerLayer;

use self::handlers::{landing, process, welcome};

pub use provider::{IdentityProvider, ProviderError, ProviderParams, SteamOpenId};
pub use session::{decode_session_key, Session, SessionSettings};

pub const LANDING_PATH: &str = "/v1/login/landing";
pub const PROCESS_PATH: &str = "/v1/login/process";
pub const WELCOME_PATH: &str = "/v1/login/welcome";

/// State of the login routes, separate from the data API state.
#[derive(Clone)]
pub struct LoginState {
    pub provider: Arc<dyn IdentityProvider>,
    pub session: SessionSettings,
}

impl FromRef<LoginState> for SessionSettings {
    fn from_ref(state: &LoginState) -> Self {
        state.session.clone()
    }
}

/// Login routes with their own state applied, mergeable into any router.
pub fn router<S>(state: LoginState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(LANDING_PATH, get(landing))
        .route(PROCESS_PATH, get(process))
        .route(WELCOME_PATH, get(welcome))
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
