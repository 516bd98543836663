//! Wispwell API server entry point.

use std::sync::Arc;

use wispwell_api::config::AppConfig;
use wispwell_api::error::AppError;
use wispwell_api::participants::{spawn_participants, stop_participants};
use wispwell_api::state::AppState;
use wispwell_core::delivery::Delivery;
use wispwell_dialogue::delivery::TracingDelivery;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    wispwell_api::init_tracing();

    tracing::info!("Starting Wispwell scene coordinator");

    let config = AppConfig::from_env()?;
    let addr = config.bind_addr()?;
    let app_state = AppState::from_config(&config).await?;

    // Characters hosted alongside the command surface, if any.
    let delivery: Arc<dyn Delivery> = Arc::new(TracingDelivery);
    let participants = spawn_participants(
        &config.participants,
        &app_state.coordinator,
        &delivery,
        config.poll,
    );

    let app = wispwell_api::build_router(app_state);
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(wispwell_api::shutdown_signal())
        .await;

    stop_participants(participants).await;
    served?;

    Ok(())
}
