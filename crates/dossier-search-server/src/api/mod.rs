//! Search HTTP API
//!
//! - `GET /search`: Boolean keyword search
//! - `GET /search/suggest`: typeahead
//! - `POST /search/semantic`: semantic / hybrid search
//! - `GET /health`: store reachability, cache counters, version
//!
//! Callers identify themselves with `x-user-id` and `x-clearance-level`.

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

/// Router-level settings
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Requests served at once; further requests wait
    pub concurrency_limit: usize,
    /// Allowed CORS origins; empty allows any origin
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: 256,
            allowed_origins: Vec::new(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Build the axum router with all search routes
pub fn build_router(state: AppState, options: &ServerOptions) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(handlers::USER_ID_HEADER),
            header::HeaderName::from_static(handlers::CLEARANCE_HEADER),
        ]);
    let cors = if options.allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = options
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    };

    // Responses may carry classified results
    let no_store = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    let nosniff = SetResponseHeaderLayer::overriding(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    Router::new()
        .route("/search", get(handlers::search))
        .route("/search/suggest", get(handlers::suggest))
        .route("/search/semantic", post(handlers::semantic_search))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .concurrency_limit(options.concurrency_limit.max(1))
                .layer(cors)
                .layer(no_store)
                .layer(nosniff),
        )
        .with_state(state)
}

/// Serve `router` on `addr` until Ctrl+C or SIGTERM
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Search API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Search API shut down");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// ============================================================================
// TESTS
// ============================================================================
