use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use serde_json::Value;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use readshelf_cache::{CacheBackend, SingleFlight, TieredCache};

use crate::{config::AppConfig, handlers, routes, upstream::Fetcher};

/// Shared application state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache: TieredCache,
    pub flights: SingleFlight<Value>,
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(config: AppConfig, backend: CacheBackend) -> anyhow::Result<Self> {
        let fetcher = Fetcher::from_config(&config.fetch)?;
        let cache = TieredCache::new(backend).with_stale_ttl(config.stale_ttl());
        Ok(Self {
            config: Arc::new(config),
            cache,
            flights: SingleFlight::new(),
            fetcher,
        })
    }
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // NYT Best Sellers proxy
        .route("/api/nyt/list-names", get(routes::nyt::list_names))
        .route("/api/nyt/overview", get(routes::nyt::overview))
        .route("/api/nyt/list", get(routes::nyt::list))
        // Google Books proxy
        .route("/api/books/search", get(routes::google_books::search))
        .route("/api/books/volume/{id}", get(routes::google_books::volume))
        .route("/api/books/enrich", get(routes::google_books::enrich))
        // Open Library proxy
        .route("/api/open/search", get(routes::open_library::search))
        .route("/api/open/book", get(routes::open_library::book))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ReadshelfServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<(ReadshelfServer, AppState)> {
        let addr = self.config.addr();
        let backend = crate::create_cache_backend(&self.config.redis).await;
        let state = AppState::new(self.config, backend)?;
        let app = build_app(state.clone());
        Ok((ReadshelfServer { addr, app }, state))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadshelfServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
