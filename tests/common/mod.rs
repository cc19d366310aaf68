//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::prelude::{Engine, BASE64_STANDARD};
use devlock_api::config::ApiConfig;
use devlock_api::db::{NamedQuery, NamedRow, QueryError, QueryExecutor};
use devlock_api::login::{IdentityProvider, ProviderError, ProviderParams};
use devlock_api::{HttpServer, Shutdown};
use futures_util::future::BoxFuture;
use serde_json::json;
use url::Url;

pub const PROVIDER_URL: &str = "https://provider.test/openid/login";
pub const STEAM_ID: &str = "76561197960287930";

/// In-memory tables interpreting the handful of query shapes the API issues.
#[derive(Default)]
pub struct MemoryExecutor {
    tables: HashMap<String, Vec<NamedRow>>,
    pub queries: Mutex<Vec<NamedQuery>>,
}

impl MemoryExecutor {
    pub fn with_table(mut self, name: &str, rows: Vec<NamedRow>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    fn run(&self, query: &NamedQuery) -> Vec<NamedRow> {
        let sql = query.sql();
        let table = sql
            .split_whitespace()
            .skip_while(|w| *w != "FROM")
            .nth(1)
            .unwrap_or_default();
        let mut rows = self.tables.get(table).cloned().unwrap_or_default();

        if let Some(id) = query.param("match_id").and_then(|v| v.as_u64()) {
            rows.retain(|r| r["match_id"].as_u64() == Some(id));
        }
        if let Some(after) = query.param("created_after").and_then(|v| v.as_i64()) {
            rows.retain(|r| r["created_at"].as_i64().is_some_and(|t| t > after));
        }
        if sql.contains("ORDER BY match_id DESC") {
            rows.sort_by_key(|r| std::cmp::Reverse(r["match_id"].as_u64()));
        }

        let skip = query.param("skip").and_then(|v| v.as_u64()).unwrap_or(0);
        let limit = query
            .param("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(u64::MAX);
        rows.into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect()
    }
}

impl QueryExecutor for MemoryExecutor {
    fn fetch_all<'a>(
        &'a self,
        query: &'a NamedQuery,
    ) -> BoxFuture<'a, Result<Vec<NamedRow>, QueryError>> {
        self.queries.lock().unwrap().push(query.clone());
        let rows = self.run(query);
        Box::pin(async move { Ok(rows) })
    }
}

/// Executor whose every query fails.
pub struct FailingExecutor;

impl QueryExecutor for FailingExecutor {
    fn fetch_all<'a>(
        &'a self,
        _query: &'a NamedQuery,
    ) -> BoxFuture<'a, Result<Vec<NamedRow>, QueryError>> {
        Box::pin(async move {
            let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
            Err(QueryError::from(err))
        })
    }
}

/// Provider accepting assertions signed with `openid.sig=good`.
pub struct FakeProvider;

impl IdentityProvider for FakeProvider {
    fn authorization_url(&self) -> Url {
        let mut url = Url::parse(PROVIDER_URL).unwrap();
        url.query_pairs_mut()
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.return_to", "http://localhost/v1/login/process");
        url
    }

    fn verify<'a>(
        &'a self,
        params: &'a ProviderParams,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            if params.get("openid.sig").map(String::as_str) != Some("good") {
                return Err(ProviderError::Rejected);
            }
            params
                .get("openid.claimed_id")
                .and_then(|id| id.rsplit('/').next())
                .map(str::to_string)
                .ok_or(ProviderError::MissingParam("openid.claimed_id"))
        })
    }
}

pub fn row(match_id: u64) -> NamedRow {
    let value = json!({ "match_id": match_id, "start_time": 1_730_000_000 + match_id });
    value.as_object().cloned().unwrap()
}

pub fn salt_row(match_id: u64, created_at: i64) -> NamedRow {
    let value = json!({
        "match_id": match_id,
        "cluster_id": 123,
        "metadata_salt": 456,
        "replay_salt": 789,
        "created_at": created_at,
    });
    value.as_object().cloned().unwrap()
}

pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.login.session_secret = Some(BASE64_STANDARD.encode([42u8; 64]));
    config
}

/// Start the server on an ephemeral port.
pub async fn spawn_server(
    config: ApiConfig,
    executor: Arc<dyn QueryExecutor>,
) -> (SocketAddr, Shutdown) {
    let server = HttpServer::new(config, executor)
        .unwrap()
        .with_identity_provider(Arc::new(FakeProvider));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Client keeping cookies and not following redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
