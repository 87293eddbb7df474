//! Axum HTTP server for the REST API

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::SchedulingService;
use crate::{Error, Result};

use super::handlers;

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// Contract routes, mounted at the root and again under the API prefix
fn contract_routes() -> Router<Arc<SchedulingService>> {
    Router::new()
        .route("/schedule", post(handlers::schedule))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/clear", delete(handlers::clear_jobs))
        .route("/jobs/{id}", delete(handlers::cancel_job))
        .route("/jobs/{id}/status", put(handlers::update_status))
}

/// Build the application router
pub fn build_router(service: Arc<SchedulingService>, api_prefix: &str) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health))
        .merge(contract_routes());

    let prefix = api_prefix.trim_end_matches('/');
    if !prefix.is_empty() {
        app = app.nest(prefix, contract_routes());
    }

    #[cfg(feature = "metrics")]
    {
        app = app.route("/metrics", get(handlers::metrics));
    }

    app.layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Run the REST API server
pub async fn run_server(
    service: Arc<SchedulingService>,
    bind_addr: &str,
    api_prefix: &str,
) -> Result<()> {
    let app = build_router(service, api_prefix);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .map_err(|e| Error::ConfigError(format!("Failed to bind to {}: {}", bind_addr, e)))?;
    info!("REST API server listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
