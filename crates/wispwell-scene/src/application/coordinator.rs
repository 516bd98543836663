//! The scene coordinator: the single entry point for state transitions.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;
use wispwell_core::clock::Clock;
use wispwell_core::error::SceneError;
use wispwell_core::repository::{SceneDefinitionRepository, SceneStateRepository};
use wispwell_core::state::StoredState;

use crate::application::command_handlers::{self, AdvanceOutcome, StopOutcome};
use crate::application::query_handlers::{self, SceneStatus};
use crate::domain::commands::{AdvanceScene, StartScene, StopScene};
use crate::domain::graph::SceneGraph;
use crate::domain::validation::ValidationReport;

/// Computes and persists every scene state transition for one process.
///
/// Writes are serialized in-process by `write_lock`; across processes the
/// state repository's atomic replace and compare-and-swap take over. Reads
/// are not serialized.
pub struct SceneCoordinator {
    definitions: Arc<dyn SceneDefinitionRepository>,
    states: Arc<dyn SceneStateRepository>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for SceneCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneCoordinator").finish_non_exhaustive()
    }
}

impl SceneCoordinator {
    /// Creates a coordinator over the given stores.
    #[must_use]
    pub fn new(
        definitions: Arc<dyn SceneDefinitionRepository>,
        states: Arc<dyn SceneStateRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            definitions,
            states,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Starts `scene_name` at `starting_node`, replacing any scene in progress.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_start_scene`].
    #[instrument(skip(self))]
    pub async fn start(
        &self,
        scene_name: &str,
        starting_node: &str,
    ) -> Result<StoredState, SceneError> {
        let command = StartScene {
            correlation_id: Uuid::new_v4(),
            scene_name: scene_name.to_owned(),
            starting_node: starting_node.to_owned(),
        };
        let _guard = self.write_lock.lock().await;
        command_handlers::handle_start_scene(
            &command,
            self.clock.as_ref(),
            self.definitions.as_ref(),
            self.states.as_ref(),
        )
        .await
    }

    /// Advances the active scene unconditionally.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_advance_scene`].
    pub async fn advance(&self) -> Result<AdvanceOutcome, SceneError> {
        self.advance_from(None).await
    }

    /// Advances the active scene, but only if it is still at `expected_node`
    /// when one is given.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_advance_scene`].
    #[instrument(skip(self))]
    pub async fn advance_from(
        &self,
        expected_node: Option<&str>,
    ) -> Result<AdvanceOutcome, SceneError> {
        let command = AdvanceScene {
            correlation_id: Uuid::new_v4(),
            expected_node: expected_node.map(str::to_owned),
        };
        let _guard = self.write_lock.lock().await;
        command_handlers::handle_advance_scene(
            &command,
            self.clock.as_ref(),
            self.definitions.as_ref(),
            self.states.as_ref(),
        )
        .await
    }

    /// Stops the scene in progress, if any.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_stop_scene`].
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<StopOutcome, SceneError> {
        let command = StopScene {
            correlation_id: Uuid::new_v4(),
        };
        let _guard = self.write_lock.lock().await;
        command_handlers::handle_stop_scene(&command, self.clock.as_ref(), self.states.as_ref())
            .await
    }

    /// Snapshot of the shared state. Never fails.
    pub async fn status(&self) -> SceneStatus {
        query_handlers::get_scene_status(self.states.as_ref()).await
    }

    /// Sorted names of every scene that can be started. Never fails.
    pub async fn list_available_scenes(&self) -> Vec<String> {
        query_handlers::list_available_scenes(self.definitions.as_ref()).await
    }

    /// Structural report for `scene_name`. Never fails.
    pub async fn validate(&self, scene_name: &str) -> ValidationReport {
        query_handlers::validate_scene(scene_name, self.definitions.as_ref()).await
    }

    /// Unsynchronized read of the raw shared record, as polled by participants.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Io` if the store cannot be read.
    pub async fn current_state(&self) -> Result<Option<StoredState>, SceneError> {
        self.states.load().await
    }

    /// Loads the graph for `scene_name` from the definition store.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::load_graph`].
    pub async fn load_graph(&self, scene_name: &str) -> Result<SceneGraph, SceneError> {
        command_handlers::load_graph(scene_name, self.definitions.as_ref()).await
    }
}
