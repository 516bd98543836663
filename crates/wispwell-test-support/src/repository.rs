//! Test repositories: mock `SceneStateRepository` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use wispwell_core::error::SceneError;
use wispwell_core::repository::SceneStateRepository;
use wispwell_core::state::{SceneState, StoredState};

/// An in-memory state store honouring the compare-and-swap contract. Every
/// successful `replace` is also recorded so tests can assert on write counts.
#[derive(Debug, Default)]
pub struct InMemorySceneStateRepository {
    record: Mutex<Option<StoredState>>,
    writes: Mutex<Vec<SceneState>>,
}

impl InMemorySceneStateRepository {
    /// Creates an empty store (no record, revision 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `state` at revision 1. The seed is
    /// not counted as a write.
    #[must_use]
    pub fn with_state(state: SceneState) -> Self {
        Self {
            record: Mutex::new(Some(StoredState { revision: 1, state })),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Returns the stored record, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self) -> Option<StoredState> {
        self.record.lock().unwrap().clone()
    }

    /// Returns every state written through `replace`, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> Vec<SceneState> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SceneStateRepository for InMemorySceneStateRepository {
    async fn load(&self) -> Result<Option<StoredState>, SceneError> {
        Ok(self.record.lock().unwrap().clone())
    }

    async fn replace(
        &self,
        state: &SceneState,
        expected_revision: Option<u64>,
    ) -> Result<u64, SceneError> {
        let mut record = self.record.lock().unwrap();
        let actual = record.as_ref().map_or(0, |r| r.revision);
        if let Some(expected) = expected_revision {
            if expected != actual {
                return Err(SceneError::Conflict { expected, actual });
            }
        }
        let revision = actual + 1;
        *record = Some(StoredState {
            revision,
            state: state.clone(),
        });
        self.writes.lock().unwrap().push(state.clone());
        Ok(revision)
    }
}

/// A state store whose every call fails with an I/O error. Useful for testing
/// error-handling and backoff paths.
#[derive(Debug)]
pub struct FailingSceneStateRepository;

#[async_trait]
impl SceneStateRepository for FailingSceneStateRepository {
    async fn load(&self) -> Result<Option<StoredState>, SceneError> {
        Err(SceneError::Io("connection refused".into()))
    }

    async fn replace(
        &self,
        _state: &SceneState,
        _expected_revision: Option<u64>,
    ) -> Result<u64, SceneError> {
        Err(SceneError::Io("connection refused".into()))
    }
}
