//! Encrypted cookie session holding the signed-in identifier.
//!
//! The whole session lives client-side in one private cookie (authenticated
//! encryption under the configured key). Nothing is stored on the server.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use base64::prelude::{Engine, BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

/// Minimum decoded key length accepted by the cookie cipher.
pub const MIN_KEY_BYTES: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SessionKeyError {
    #[error("session secret is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("session secret must decode to at least {MIN_KEY_BYTES} bytes, got {0}")]
    TooShort(usize),
}

/// Decode the base64 session secret into a cookie key.
pub fn decode_session_key(secret: &str) -> Result<Key, SessionKeyError> {
    let bytes = BASE64_STANDARD.decode(secret.trim())?;
    if bytes.len() < MIN_KEY_BYTES {
        return Err(SessionKeyError::TooShort(bytes.len()));
    }
    Key::try_from(bytes.as_slice()).map_err(|_| SessionKeyError::TooShort(bytes.len()))
}

/// Cookie parameters shared by every request.
#[derive(Clone)]
pub struct SessionSettings {
    pub key: Key,
    pub cookie_name: String,
    pub secure: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    steam_id: Option<String>,
}

/// Per-request view of the session cookie.
pub struct Session {
    cookies: Cookies,
    settings: SessionSettings,
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionSettings: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state).await?;
        Ok(Self {
            cookies,
            settings: SessionSettings::from_ref(state),
        })
    }
}

impl Session {
    /// Identifier of the signed-in user, if the cookie decrypts and parses.
    pub fn steam_id(&self) -> Option<String> {
        let cookie = self
            .cookies
            .private(&self.settings.key)
            .get(&self.settings.cookie_name)?;
        serde_json::from_str::<SessionData>(cookie.value())
            .ok()?
            .steam_id
    }

    pub fn set_steam_id(&self, steam_id: &str) {
        let data = SessionData {
            steam_id: Some(steam_id.to_string()),
        };
        // Serializing a struct of strings cannot fail.
        let value = serde_json::to_string(&data).unwrap_or_default();
        self.cookies
            .private(&self.settings.key)
            .add(self.cookie(value));
    }

    /// Drop the whole session.
    pub fn clear(&self) {
        self.cookies
            .private(&self.settings.key)
            .remove(self.cookie(String::new()));
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((self.settings.cookie_name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.secure)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_session_key() {
        assert!(decode_session_key(&BASE64_STANDARD.encode([3u8; 64])).is_ok());
        assert!(decode_session_key(&format!(" {}\n", BASE64_STANDARD.encode([3u8; 96]))).is_ok());

        assert!(matches!(
            decode_session_key(&BASE64_STANDARD.encode([3u8; 32])),
            Err(SessionKeyError::TooShort(32))
        ));
        assert!(matches!(
            decode_session_key("not base64!"),
            Err(SessionKeyError::Base64(_))
        ));
    }

    #[test]
    fn test_session_data_shape() {
        let data = SessionData {
            steam_id: Some("76561197960287930".into()),
        };
        assert_eq!(
            serde_json::to_string(&data).unwrap(),
            r#"{"steam_id":"76561197960287930"}"#
        );
        let empty: SessionData = serde_json::from_str("{}").unwrap();
        assert!(empty.steam_id.is_none());
    }
}
