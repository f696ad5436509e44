//! contentvc web server and REST API.
//!
//! Provides an Axum-based HTTP server with:
//! - Version history, creation and restore endpoints
//! - Comparison and merge endpoints backed by the comparison cache
//! - Conflict resolution for merged bodies
//! - Per-tenant audit log API
//! - Status and health endpoints
//!
//! The caller's tenant is taken from the `X-Tenant-Id` header on every
//! tenant-scoped request.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use contentvc_core::config::AppConfig;
use contentvc_core::db::Database;
use contentvc_core::store::SqliteVersionStore;
use contentvc_core::VersionControl;

/// Floor for the request body limit, whatever `limits.max_body_bytes` is.
const MIN_REQUEST_LIMIT: usize = 64 * 1024;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub control: VersionControl,
    /// Direct database handle for audit-log queries.
    pub db: Arc<Database>,
    pub config: AppConfig,
}

impl AppState {
    /// Build the state over an initialised database.
    pub fn new(config: AppConfig, db: Arc<Database>) -> Self {
        let store = Arc::new(SqliteVersionStore::new(Arc::clone(&db)));
        let control = VersionControl::from_config(&config, store);
        Self { control, db, config }
    }
}

/// Build the full router with middleware over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(api::tenant::TENANT_HEADER),
        ]);

    // JSON escaping can roughly double a body on the wire.
    let body_limit = state
        .config
        .limits
        .max_body_bytes
        .saturating_mul(2)
        .max(MIN_REQUEST_LIMIT);

    Router::new()
        .merge(api::status::routes())
        .merge(api::versions::routes())
        .merge(api::merge::routes())
        .merge(api::audit::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    pub fn new(config: AppConfig, db: Arc<Database>) -> Self {
        Self {
            state: Arc::new(AppState::new(config, db)),
        }
    }

    /// Start the web server, listening on the given address until Ctrl-C.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = router(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("web server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
