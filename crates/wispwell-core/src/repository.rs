//! Storage seams for scene definitions and the shared scene state.

use async_trait::async_trait;

use crate::error::SceneError;
use crate::state::{SceneState, StoredState};

/// Raw scene definition: node id to node content, in file order.
pub type SceneDocument = serde_json::Map<String, serde_json::Value>;

/// Read-only access to the declarative dialogue graphs.
#[async_trait]
pub trait SceneDefinitionRepository: Send + Sync {
    /// Loads the raw document for `scene_name`.
    ///
    /// Returns `SceneError::NotFound` when no such scene exists and
    /// `SceneError::MalformedGraph` when it cannot be parsed as a mapping.
    async fn load_document(&self, scene_name: &str) -> Result<SceneDocument, SceneError>;

    /// Lists every scene name, sorted lexicographically.
    async fn list_scene_names(&self) -> Result<Vec<String>, SceneError>;
}

/// Linearizable single-record store holding the shared `SceneState`.
#[async_trait]
pub trait SceneStateRepository: Send + Sync {
    /// Loads the current record, or `None` if nothing was ever written.
    async fn load(&self) -> Result<Option<StoredState>, SceneError>;

    /// Atomically replaces the whole record and returns the new revision.
    ///
    /// With `expected_revision = None` the write is unconditional (last
    /// writer wins). With `Some(r)` the write succeeds only if the stored
    /// revision is still `r` (`0` meaning "no record"), and otherwise fails
    /// with `SceneError::Conflict` without touching the record.
    async fn replace(
        &self,
        state: &SceneState,
        expected_revision: Option<u64>,
    ) -> Result<u64, SceneError>;
}
