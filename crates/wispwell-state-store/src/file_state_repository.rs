//! Single-file `SceneStateRepository`.
//!
//! The record is a JSON document holding the scene state fields plus a
//! `revision` counter. Writes land in a temporary file beside the record and
//! are renamed over it, so a reader in any process sees either the old or the
//! new document, never a mix.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use wispwell_core::error::SceneError;
use wispwell_core::repository::SceneStateRepository;
use wispwell_core::state::{SceneState, StoredState};

#[derive(Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    revision: u64,
    #[serde(flatten)]
    state: SceneState,
}

/// Scene state kept in one JSON file.
///
/// Compare-and-swap is exact between writers sharing this value and
/// best-effort between processes; use the SQLite backend where concurrent
/// coordinators in several processes must never lose an update.
#[derive(Debug)]
pub struct FileSceneStateRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSceneStateRepository {
    /// Creates a repository for the record at `path`. Missing parent
    /// directories are created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The record's location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> Result<Option<StoredState>, SceneError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "scene state file not found");
                return Ok(None);
            }
            Err(e) => return Err(SceneError::Io(format!("{}: {e}", self.path.display()))),
        };

        match serde_json::from_str::<StateDocument>(&raw) {
            Ok(doc) => Ok(Some(StoredState {
                revision: doc.revision,
                state: doc.state,
            })),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "invalid scene state file, treating as empty");
                Ok(None)
            }
        }
    }

    async fn write_record(&self, document: &StateDocument) -> Result<(), SceneError> {
        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| SceneError::Io(format!("state serialization failed: {e}")))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let target = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), SceneError> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| SceneError::Io(e.error.to_string()))?;
            Ok(())
        })
        .await
        .map_err(|e| SceneError::Io(format!("state writer task failed: {e}")))?
    }
}

#[async_trait]
impl SceneStateRepository for FileSceneStateRepository {
    async fn load(&self) -> Result<Option<StoredState>, SceneError> {
        self.read_record().await
    }

    async fn replace(
        &self,
        state: &SceneState,
        expected_revision: Option<u64>,
    ) -> Result<u64, SceneError> {
        let _guard = self.write_lock.lock().await;

        let actual = self.read_record().await?.map_or(0, |r| r.revision);
        if let Some(expected) = expected_revision {
            if expected != actual {
                return Err(SceneError::Conflict { expected, actual });
            }
        }

        let document = StateDocument {
            revision: actual + 1,
            state: state.clone(),
        };
        self.write_record(&document).await?;
        debug!(path = %self.path.display(), revision = document.revision, "saved scene state");
        Ok(document.revision)
    }
}
