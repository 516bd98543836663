//! Directory-backed `SceneDefinitionRepository`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};
use wispwell_core::error::SceneError;
use wispwell_core::repository::{SceneDefinitionRepository, SceneDocument};

/// Extension a file must carry to be listed as a scene.
pub const SCENE_FILE_EXTENSION: &str = "json";

/// Reads scene documents from `<dir>/<scene_name>`.
#[derive(Debug, Clone)]
pub struct FileSceneDefinitionRepository {
    dir: PathBuf,
}

impl FileSceneDefinitionRepository {
    /// Creates a repository over `dir`. The directory need not exist yet.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory scenes are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a scene name to a path inside the directory. Names that would
    /// escape it are treated as missing.
    fn scene_path(&self, scene_name: &str) -> Result<PathBuf, SceneError> {
        let mut components = Path::new(scene_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(scene_name)),
            _ => Err(SceneError::NotFound(format!("scene {scene_name}"))),
        }
    }
}

#[async_trait]
impl SceneDefinitionRepository for FileSceneDefinitionRepository {
    async fn load_document(&self, scene_name: &str) -> Result<SceneDocument, SceneError> {
        let path = self.scene_path(scene_name)?;
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(path = %path.display(), "scene file not found");
                return Err(SceneError::NotFound(format!("scene {scene_name}")));
            }
            Err(e) => return Err(SceneError::Io(format!("{}: {e}", path.display()))),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(document)) => {
                debug!(scene = scene_name, nodes = document.len(), "loaded scene document");
                Ok(document)
            }
            Ok(_) => Err(SceneError::MalformedGraph(format!(
                "{scene_name}: top-level value is not an object"
            ))),
            Err(e) => {
                error!(scene = scene_name, error = %e, "invalid JSON in scene file");
                Err(SceneError::MalformedGraph(format!("{scene_name}: {e}")))
            }
        }
    }

    async fn list_scene_names(&self) -> Result<Vec<String>, SceneError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SCENE_FILE_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
