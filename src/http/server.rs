//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build process-scoped state (executor, limiter, login) once at startup
//! - Create the Axum router: shell routes, /v1 data routes, login routes
//! - Wire up middleware (request id, tracing, compression, timeout, metrics)
//! - Serve with peer addresses available and graceful shutdown
//! - Sweep expired rate-limit windows while serving

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    compression::{
        predicate::{DefaultPredicate, Predicate, SizeAbove},
        CompressionLayer,
    },
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
    CompressionLevel,
};

use crate::api;
use crate::config::ApiConfig;
use crate::db::QueryExecutor;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::login::{
    self, decode_session_key, session::SessionKeyError, IdentityProvider, LoginState,
    ProviderError, SessionSettings, SteamOpenId,
};
use crate::observability::metrics;
use crate::security::{PolicyError, RateLimiterState};

/// Failure to assemble the server from a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("login is enabled but no session secret is configured")]
    MissingSessionSecret,

    #[error(transparent)]
    SessionKey(#[from] SessionKeyError),

    #[error("identity provider: {0}")]
    Provider(#[from] ProviderError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    pub metrics: Option<PrometheusHandle>,
}

/// HTTP server for the API.
pub struct HttpServer {
    config: ApiConfig,
    state: AppState,
    limiter: Arc<RateLimiterState>,
    login: Option<LoginState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and data layer.
    pub fn new(config: ApiConfig, executor: Arc<dyn QueryExecutor>) -> Result<Self, ServerError> {
        let limiter = Arc::new(RateLimiterState::from_config(&config.rate_limit)?);

        let login = if config.login.enabled {
            let secret = config
                .login
                .session_secret
                .as_deref()
                .ok_or(ServerError::MissingSessionSecret)?;
            let provider = SteamOpenId::new(
                &config.login.provider_url,
                &config.login.public_url,
                login::PROCESS_PATH,
            )?;
            Some(LoginState {
                provider: Arc::new(provider),
                session: SessionSettings {
                    key: decode_session_key(secret)?,
                    cookie_name: config.login.cookie_name.clone(),
                    secure: config.login.secure_cookie,
                },
            })
        } else {
            None
        };

        Ok(Self {
            config,
            state: AppState {
                executor,
                metrics: None,
            },
            limiter,
            login,
        })
    }

    /// Replace the identity provider (no effect when login is disabled).
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        if let Some(login) = self.login.as_mut() {
            login.provider = provider;
        }
        self
    }

    /// Serve the given recorder on the configured metrics path.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let mut app = Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/docs", get(docs))
            .merge(api::router(self.limiter.clone()));

        if let Some(login) = &self.login {
            app = app.merge(login::router(login.clone()));
        }

        if self.config.observability.metrics_enabled && self.state.metrics.is_some() {
            app = app.route(&self.config.observability.metrics_path, get(render_metrics));
        }

        let compression = &self.config.compression;
        let enabled = compression.enabled;
        let predicate = DefaultPredicate::new()
            .and(SizeAbove::new(compression.min_size))
            .and(move |_: StatusCode, _: axum::http::Version, _: &axum::http::HeaderMap, _: &axum::http::Extensions| enabled);

        app.with_state(self.state.clone())
            .layer(middleware::from_fn(metrics::track_metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id(req),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(
                        CompressionLayer::new()
                            .quality(CompressionLevel::Precise(i32::from(compression.level)))
                            .compress_when(predicate),
                    )
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        self.config.timeouts.request_secs,
                    ))),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            login = self.login.is_some(),
            rate_limit = self.config.rate_limit.enabled,
            "HTTP server starting"
        );

        let sweeper = self.spawn_window_sweeper();
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_window_sweeper(&self) -> JoinHandle<()> {
        let limiter = self.limiter.clone();
        let period = limiter.longest_window();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = limiter.limiter().purge_expired(Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, remaining = limiter.limiter().len(), "Purged rate limit windows");
                }
            }
        })
    }
}

async fn root() -> Redirect {
    Redirect::temporary("/docs")
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn docs() -> Html<&'static str> {
    Html(DOCS_PAGE)
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

const DOCS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Devlock API</title></head>
<body>
<h1>Devlock API v1</h1>
<p>All data routes are limited to 100 requests per minute per client.</p>
<ul>
<li><code>GET /v1/matches?skip=0</code> &mdash; match info, 20 per page</li>
<li><code>GET /v1/matches/{match_id}/meta</code> &mdash; one match, or <code>null</code></li>
<li><code>GET /v1/salts?skip=0&amp;created_after=2024-11-05T00:00:00Z</code> &mdash; match salts, newest match first, 1000 per page</li>
<li><code>GET /v1/active-matches?skip=0</code> &mdash; active match summaries, 500 per page</li>
<li><code>GET /v1/login/landing</code> &mdash; Steam sign-in</li>
<li><code>GET /health</code> &mdash; liveness</li>
</ul>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NamedQuery, NamedRow, QueryError};
    use futures_util::future::BoxFuture;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    struct EmptyExecutor;

    impl QueryExecutor for EmptyExecutor {
        fn fetch_all<'a>(
            &'a self,
            _query: &'a NamedQuery,
        ) -> BoxFuture<'a, Result<Vec<NamedRow>, QueryError>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn server(config: ApiConfig) -> HttpServer {
        HttpServer::new(config, Arc::new(EmptyExecutor)).unwrap()
    }

    fn no_login() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.login.enabled = false;
        config
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_redirects_to_docs() {
        let res = get(server(no_login()).router(), "/").await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()["location"], "/docs");
    }

    #[tokio::test]
    async fn test_metrics_route_requires_handle() {
        let without = get(server(no_login()).router(), "/metrics").await;
        assert_eq!(without.status(), StatusCode::NOT_FOUND);

        let handle = PrometheusBuilder::new().build_recorder().handle();
        let with = get(server(no_login()).with_metrics(handle).router(), "/metrics").await;
        assert_eq!(with.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_requests_without_peer_share_a_window() {
        let mut config = no_login();
        config
            .rate_limit
            .routes
            .insert("/v1/active-matches".into(), "1/minute".into());
        let app = server(config).router();

        let first = get(app.clone(), "/v1/active-matches").await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = get(app, "/v1/active-matches").await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_bad_policy_fails_construction() {
        let mut config = no_login();
        config
            .rate_limit
            .routes
            .insert("/v1/salts".into(), "lots/minute".into());
        assert!(matches!(
            HttpServer::new(config, Arc::new(EmptyExecutor)),
            Err(ServerError::Policy(_))
        ));
    }
}
