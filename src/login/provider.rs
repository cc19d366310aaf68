//! Third-party identity provider seam and the Steam OpenID 2.0 client.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::future::BoxFuture;
use url::Url;

pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
pub const STEAM_CLAIMED_ID_PREFIX: &str = "https://steamcommunity.com/openid/id/";

/// Raw query parameters the provider appended to the callback URL.
pub type ProviderParams = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("missing parameter '{0}'")]
    MissingParam(&'static str),

    #[error("unexpected openid.mode '{0}'")]
    Mode(String),

    #[error("openid.return_to '{0}' does not match the callback")]
    ReturnTo(String),

    #[error("claimed id '{0}' is not a Steam identity")]
    ClaimedId(String),

    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected the assertion")]
    Rejected,
}

/// External sign-in provider.
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start a login; the provider comes back
    /// to the callback this provider was built with.
    fn authorization_url(&self) -> Url;

    /// Check the callback parameters and return the authenticated identifier.
    fn verify<'a>(&'a self, params: &'a ProviderParams)
        -> BoxFuture<'a, Result<String, ProviderError>>;
}

/// Steam's OpenID 2.0 endpoint.
pub struct SteamOpenId {
    endpoint: Url,
    realm: String,
    callback: Url,
    http: reqwest::Client,
}

impl SteamOpenId {
    pub fn new(endpoint: &str, public_url: &str, callback_path: &str) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(endpoint)?;
        let realm = Url::parse(public_url)?;
        let callback = realm.join(callback_path)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            endpoint,
            realm: realm.as_str().to_string(),
            callback,
            http,
        })
    }

    pub fn callback(&self) -> &Url {
        &self.callback
    }
}

impl IdentityProvider for SteamOpenId {
    fn authorization_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.return_to", self.callback.as_str())
            .append_pair("openid.realm", &self.realm)
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT);
        url
    }

    fn verify<'a>(
        &'a self,
        params: &'a ProviderParams,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let steam_id = check_assertion(params, &self.callback)?;

            // Ask the provider to confirm the signature on our behalf.
            let mut form = params.clone();
            form.insert("openid.mode".to_string(), "check_authentication".to_string());

            let body = self
                .http
                .post(self.endpoint.clone())
                .form(&form)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;

            if is_valid_response(&body) {
                Ok(steam_id)
            } else {
                Err(ProviderError::Rejected)
            }
        })
    }
}

/// Local checks on a positive assertion; returns the SteamID64.
pub fn check_assertion(params: &ProviderParams, callback: &Url) -> Result<String, ProviderError> {
    let get = |name: &'static str| {
        params
            .get(name)
            .map(String::as_str)
            .ok_or(ProviderError::MissingParam(name))
    };

    let mode = get("openid.mode")?;
    if mode != "id_res" {
        return Err(ProviderError::Mode(mode.to_string()));
    }

    let return_to = get("openid.return_to")?;
    let same_target = Url::parse(return_to)
        .map(|u| u.origin() == callback.origin() && u.path() == callback.path())
        .unwrap_or(false);
    if !same_target {
        return Err(ProviderError::ReturnTo(return_to.to_string()));
    }

    let claimed_id = get("openid.claimed_id")?;
    match claimed_id.strip_prefix(STEAM_CLAIMED_ID_PREFIX) {
        Some(id) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => Ok(id.to_string()),
        _ => Err(ProviderError::ClaimedId(claimed_id.to_string())),
    }
}

/// Key-value form reply to `check_authentication`.
fn is_valid_response(body: &str) -> bool {
    body.lines().any(|line| line.trim() == "is_valid:true")
}
