//! Shared application state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use wispwell_core::clock::SystemClock;
use wispwell_core::repository::SceneStateRepository;
use wispwell_scene::application::coordinator::SceneCoordinator;
use wispwell_state_store::file_definition_repository::FileSceneDefinitionRepository;
use wispwell_state_store::file_state_repository::FileSceneStateRepository;
use wispwell_state_store::sqlite_state_repository::SqliteSceneStateRepository;

use crate::config::{AppConfig, DEFAULT_SCENE, StateBackend};
use crate::error::AppError;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process's scene coordinator.
    pub coordinator: Arc<SceneCoordinator>,
    /// Scene started when a start request names none.
    pub default_scene: Arc<str>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(coordinator: Arc<SceneCoordinator>) -> Self {
        Self {
            coordinator,
            default_scene: Arc::from(DEFAULT_SCENE),
        }
    }

    /// Replaces the scene started by default.
    #[must_use]
    pub fn with_default_scene(mut self, scene_name: &str) -> Self {
        self.default_scene = Arc::from(scene_name);
        self
    }

    /// Opens the stores named by `config` and builds a coordinator over them.
    /// The scene directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Server` if a directory cannot be created and
    /// `AppError::Storage` if the state store cannot be opened.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.scene_dir).await?;
        let definitions = Arc::new(FileSceneDefinitionRepository::new(&config.scene_dir));

        let states: Arc<dyn SceneStateRepository> = match config.state_backend {
            StateBackend::File => {
                info!(path = %config.state_file.display(), "using file scene state store");
                Arc::new(FileSceneStateRepository::new(&config.state_file))
            }
            StateBackend::Sqlite => {
                if let Some(parent) = sqlite_file_path(&config.database_url)
                    .as_deref()
                    .and_then(Path::parent)
                    .filter(|p| !p.as_os_str().is_empty())
                {
                    tokio::fs::create_dir_all(parent).await?;
                }
                info!(url = %config.database_url, "using sqlite scene state store");
                Arc::new(SqliteSceneStateRepository::connect(&config.database_url).await?)
            }
        };

        let coordinator = SceneCoordinator::new(definitions, states, Arc::new(SystemClock));
        Ok(Self::new(Arc::new(coordinator)).with_default_scene(&config.default_scene))
    }
}

/// The database file behind a `sqlite:` URL, or `None` for in-memory URLs.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
