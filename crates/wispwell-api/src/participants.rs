//! Hosting turn participants inside a process.

use std::sync::Arc;

use tracing::info;
use wispwell_core::delivery::Delivery;
use wispwell_dialogue::monitor::ParticipantHandle;
use wispwell_dialogue::participant::TurnParticipant;
use wispwell_dialogue::settings::PollSettings;
use wispwell_scene::application::coordinator::SceneCoordinator;

/// Starts one monitoring loop per name in `identities`. Names listed twice
/// get a single loop.
pub fn spawn_participants(
    identities: &[String],
    coordinator: &Arc<SceneCoordinator>,
    delivery: &Arc<dyn Delivery>,
    settings: PollSettings,
) -> Vec<ParticipantHandle> {
    let mut handles: Vec<ParticipantHandle> = Vec::with_capacity(identities.len());
    for identity in identities {
        if handles.iter().any(|h| h.identity() == identity.as_str()) {
            continue;
        }
        let participant =
            TurnParticipant::new(identity.clone(), coordinator.clone(), delivery.clone(), settings);
        handles.extend(participant.start_monitoring());
    }
    info!(count = handles.len(), "turn participants running");
    handles
}

/// Stops every loop in `handles`, one after another.
pub async fn stop_participants(handles: Vec<ParticipantHandle>) {
    for handle in handles {
        handle.stop().await;
    }
}
