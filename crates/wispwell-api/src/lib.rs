//! Wispwell: process host library.
//!
//! Shared by the `wispwell-api` binary (command surface plus any in-process
//! participants) and the `wispwell-participant` binary (participants only).

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

pub mod config;
pub mod error;
pub mod participants;
pub mod routes;
pub mod state;

/// Installs the JSON tracing subscriber, filtered by `RUST_LOG` (default
/// `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();
}

/// Builds the full router over `app_state`.
pub fn build_router(app_state: state::AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with restricted origins once a
    // presentation layer is deployed in front of the command surface.
    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/scenes", routes::scenes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// Resolves when the process receives Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
