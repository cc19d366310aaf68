//! Query-string parameters of the `/v1` data routes.

use serde::Deserialize;
use time::format_description::well_known::Iso8601;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::http::error::ApiError;

/// `?skip=<n>`; absent means the first page.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaltParams {
    #[serde(default)]
    pub skip: u64,
    pub created_after: Option<String>,
}

impl SaltParams {
    /// Absent or blank means no time filter.
    pub fn created_after(&self) -> Result<Option<OffsetDateTime>, ApiError> {
        match self.created_after.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_timestamp(raw).map(Some),
        }
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC,
/// a bare date as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, ApiError> {
    let normalized = raw.replacen(' ', "T", 1);

    if let Ok(ts) = OffsetDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(ts);
    }
    if let Ok(ts) = PrimitiveDateTime::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(ts.assume_utc());
    }
    if let Ok(date) = Date::parse(&normalized, &Iso8601::DEFAULT) {
        return Ok(date.midnight().assume_utc());
    }

    Err(ApiError::BadRequest(format!(
        "created_after: '{raw}' is not an ISO-8601 timestamp"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_timestamp_forms() {
        assert_eq!(
            parse_timestamp("2024-11-05T10:30:00Z").unwrap(),
            datetime!(2024-11-05 10:30:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-11-05T12:30:00+02:00").unwrap(),
            datetime!(2024-11-05 10:30:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-11-05T10:30:00").unwrap(),
            datetime!(2024-11-05 10:30:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-11-05 10:30:00").unwrap(),
            datetime!(2024-11-05 10:30:00 UTC)
        );
        assert_eq!(
            parse_timestamp("2024-11-05").unwrap(),
            datetime!(2024-11-05 0:00 UTC)
        );
    }

    #[test]
    fn test_bad_timestamp_is_validation_error() {
        for raw in ["yesterday", "2024-13-01", "2024-11-05T25:00:00"] {
            assert!(
                matches!(parse_timestamp(raw), Err(ApiError::BadRequest(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_blank_created_after_is_no_filter() {
        let params = SaltParams {
            skip: 0,
            created_after: Some("  ".into()),
        };
        assert!(params.created_after().unwrap().is_none());
        assert!(SaltParams::default().created_after().unwrap().is_none());
    }
}
