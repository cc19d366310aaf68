//! Handlers for the `/v1` data routes.
//!
//! Each handler maps its parameters onto one [`NamedQuery`] and returns the
//! rows untouched.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use time::OffsetDateTime;

use crate::api::params::{PageParams, SaltParams};
use crate::db::{NamedQuery, NamedRow};
use crate::http::error::ApiError;
use crate::http::server::AppState;

pub const MATCHES_PAGE_SIZE: u64 = 20;
pub const SALTS_PAGE_SIZE: u64 = 1000;
pub const ACTIVE_MATCHES_PAGE_SIZE: u64 = 500;

pub fn matches_query(skip: u64) -> NamedQuery {
    NamedQuery::new("SELECT * FROM match_info LIMIT {limit:UInt64} OFFSET {skip:UInt64}")
        .bind("limit", MATCHES_PAGE_SIZE)
        .bind("skip", skip)
}

pub fn match_meta_query(match_id: u64) -> NamedQuery {
    NamedQuery::new("SELECT * FROM match_info WHERE match_id = {match_id:UInt64}")
        .bind("match_id", match_id)
}

pub fn salts_query(skip: u64, created_after: Option<OffsetDateTime>) -> NamedQuery {
    // created_at is an unsigned DateTime, so any pre-epoch bound filters nothing.
    let query = match created_after.filter(|ts| ts.unix_timestamp() >= 0) {
        Some(ts) => NamedQuery::new(
            "SELECT * FROM match_salts \
             WHERE created_at > fromUnixTimestamp({created_after:Int64}) \
             ORDER BY match_id DESC \
             LIMIT {limit:UInt64} OFFSET {skip:UInt64}",
        )
        .bind("created_after", ts.unix_timestamp()),
        None => NamedQuery::new(
            "SELECT * FROM match_salts \
             ORDER BY match_id DESC \
             LIMIT {limit:UInt64} OFFSET {skip:UInt64}",
        ),
    };
    query.bind("limit", SALTS_PAGE_SIZE).bind("skip", skip)
}

pub fn active_matches_query(skip: u64) -> NamedQuery {
    NamedQuery::new(
        "SELECT * FROM summary_active_matches LIMIT {limit:UInt64} OFFSET {skip:UInt64}",
    )
    .bind("limit", ACTIVE_MATCHES_PAGE_SIZE)
    .bind("skip", skip)
}

pub async fn list_matches(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<NamedRow>>, ApiError> {
    let Query(params) = params?;
    let rows = state.executor.fetch_all(&matches_query(params.skip)).await?;
    Ok(Json(rows))
}

pub async fn match_meta(
    State(state): State<AppState>,
    match_id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Option<NamedRow>>, ApiError> {
    let Path(match_id) = match_id?;
    let row = state
        .executor
        .fetch_first(&match_meta_query(match_id))
        .await?;
    Ok(Json(row))
}

pub async fn list_salts(
    State(state): State<AppState>,
    params: Result<Query<SaltParams>, QueryRejection>,
) -> Result<Json<Vec<NamedRow>>, ApiError> {
    let Query(params) = params?;
    let created_after = params.created_after()?;
    let rows = state
        .executor
        .fetch_all(&salts_query(params.skip, created_after))
        .await?;
    Ok(Json(rows))
}

pub async fn list_active_matches(
    State(state): State<AppState>,
    params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<NamedRow>>, ApiError> {
    let Query(params) = params?;
    let rows = state
        .executor
        .fetch_all(&active_matches_query(params.skip))
        .await?;
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ParamValue;
    use time::macros::datetime;

    #[test]
    fn test_page_sizes_are_bound() {
        assert_eq!(matches_query(0).param("limit"), Some(&ParamValue::UInt(20)));
        assert_eq!(salts_query(0, None).param("limit"), Some(&ParamValue::UInt(1000)));
        assert_eq!(active_matches_query(0).param("limit"), Some(&ParamValue::UInt(500)));
        assert_eq!(active_matches_query(42).param("skip"), Some(&ParamValue::UInt(42)));
    }

    #[test]
    fn test_values_never_spliced_into_sql() {
        let query = match_meta_query(31_337);
        assert!(!query.sql().contains("31337"));
        assert_eq!(query.param("match_id"), Some(&ParamValue::UInt(31_337)));

        let query = salts_query(u64::MAX, Some(datetime!(2024-11-05 10:30:00 UTC)));
        assert!(!query.sql().contains("1730802600"));
        assert_eq!(query.param("skip"), Some(&ParamValue::UInt(u64::MAX)));
    }

    #[test]
    fn test_salts_filter_only_when_requested() {
        let unfiltered = salts_query(0, None);
        assert!(!unfiltered.sql().contains("created_at"));
        assert_eq!(unfiltered.param("created_after"), None);
        assert!(unfiltered.sql().contains("ORDER BY match_id DESC"));

        let filtered = salts_query(0, Some(datetime!(2024-11-05 10:30:00 UTC)));
        assert!(filtered.sql().contains("created_at >"));
        assert_eq!(
            filtered.param("created_after"),
            Some(&ParamValue::Int(1_730_802_600))
        );
    }

    #[test]
    fn test_pre_epoch_created_after_is_unfiltered() {
        let query = salts_query(0, Some(datetime!(1969-12-31 23:59:59 UTC)));
        assert_eq!(query.sql(), salts_query(0, None).sql());
        assert_eq!(query.param("created_after"), None);

        let epoch = salts_query(0, Some(datetime!(1970-01-01 00:00:00 UTC)));
        assert_eq!(epoch.param("created_after"), Some(&ParamValue::Int(0)));
    }
}
