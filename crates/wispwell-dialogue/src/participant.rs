//! One character's turn logic.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use wispwell_core::delivery::Delivery;
use wispwell_core::error::SceneError;
use wispwell_scene::application::command_handlers::AdvanceOutcome;
use wispwell_scene::application::coordinator::SceneCoordinator;

use crate::settings::PollSettings;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No scene is active.
    Idle,
    /// Another participant is due.
    NotMyTurn,
    /// The state named this participant but the node belongs to someone
    /// else; nothing was delivered.
    SpeakerMismatch,
    /// The line for `node` was delivered and an advance was requested.
    Spoke {
        /// Node whose line was spoken.
        node: String,
        /// What the coordinator did with the advance.
        advance: AdvanceOutcome,
    },
    /// The turn was won but could not be carried out; retried next tick.
    Abandoned(String),
}

/// Speaks for one named character in the active scene.
#[derive(Clone)]
pub struct TurnParticipant {
    pub(crate) identity: String,
    pub(crate) coordinator: Arc<SceneCoordinator>,
    pub(crate) delivery: Arc<dyn Delivery>,
    pub(crate) settings: PollSettings,
    pub(crate) running: Arc<AtomicBool>,
}

impl std::fmt::Debug for TurnParticipant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnParticipant")
            .field("identity", &self.identity)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TurnParticipant {
    /// Creates a participant for `identity`. Nothing runs until
    /// [`TurnParticipant::start_monitoring`] is called.
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        coordinator: Arc<SceneCoordinator>,
        delivery: Arc<dyn Delivery>,
        settings: PollSettings,
    ) -> Self {
        Self {
            identity: identity.into(),
            coordinator,
            delivery,
            settings,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The character this participant speaks for.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Reads the shared state once and takes the turn if it is ours.
    ///
    /// Failures after the turn check are logged and reported as
    /// [`TickOutcome::Abandoned`]; nothing is retried within the tick.
    ///
    /// # Errors
    ///
    /// Returns the store error if the state cannot be read, and
    /// `SceneError::Cancelled` if `shutdown` fires during the post-line wait.
    /// A cancelled tick never advances the scene.
    #[instrument(skip_all, fields(participant = %self.identity))]
    pub async fn tick(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<TickOutcome, SceneError> {
        let Some(stored) = self.coordinator.current_state().await? else {
            return Ok(TickOutcome::Idle);
        };
        let state = stored.state;
        let Some(due) = state.speaker_due() else {
            return Ok(TickOutcome::Idle);
        };
        if due != self.identity {
            debug!(next_speaker = due, "not our turn");
            return Ok(TickOutcome::NotMyTurn);
        }

        let (Some(scene), Some(node_id)) = (state.scene.as_deref(), state.current_node.as_deref())
        else {
            return Ok(self.abandon("active state names no scene or node".into()));
        };
        let graph = match self.coordinator.load_graph(scene).await {
            Ok(graph) => graph,
            Err(e) => return Ok(self.abandon(format!("cannot load scene {scene}: {e}"))),
        };
        let Some(node) = graph.node(node_id) else {
            return Ok(self.abandon(format!("node {node_id} is not in scene {scene}")));
        };
        if node.declared_speaker() != Some(self.identity.as_str()) {
            warn!(node = node_id, speaker = ?node.speaker, "stale read, node belongs to another speaker");
            return Ok(TickOutcome::SpeakerMismatch);
        }

        let text = node.text.as_deref().unwrap_or_default();
        match self.delivery.deliver(&self.identity, text).await {
            Ok(()) => info!(node = node_id, "line delivered"),
            Err(e) => error!(node = node_id, error = %e, "delivery failed, advancing anyway"),
        }

        tokio::select! {
            () = tokio::time::sleep(node.wait_duration(self.settings.default_wait)) => {}
            () = shutdown_signalled(shutdown) => {
                info!(node = node_id, "cancelled during post-line wait");
                return Err(SceneError::Cancelled);
            }
        }

        match self.coordinator.advance_from(Some(node_id)).await {
            Ok(advance) => Ok(TickOutcome::Spoke {
                node: node_id.to_owned(),
                advance,
            }),
            Err(e) => Ok(self.abandon(format!("advance from {node_id} failed: {e}"))),
        }
    }

    fn abandon(&self, reason: String) -> TickOutcome {
        error!(participant = %self.identity, reason = %reason, "turn abandoned");
        TickOutcome::Abandoned(reason)
    }
}

/// Resolves once `true` has been sent on `shutdown` or its sender is gone.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
