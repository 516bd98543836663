//! Runs turn participants without a command surface, one process per cast.

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

    let config = AppConfig::from_env()?;
    if config.participants.is_empty() {
        return Err(AppError::Config(
            "PARTICIPANTS must name at least one character".into(),
        ));
    }

    let app_state = AppState::from_config(&config).await?;
    let delivery: Arc<dyn Delivery> = Arc::new(TracingDelivery);
    let participants = spawn_participants(
        &config.participants,
        &app_state.coordinator,
        &delivery,
        config.poll,
    );

    wispwell_api::shutdown_signal().await;
    stop_participants(participants).await;

    Ok(())
}
