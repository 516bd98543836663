//! Test definitions: an in-memory `SceneDefinitionRepository`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use wispwell_core::error::SceneError;
use wispwell_core::repository::{SceneDefinitionRepository, SceneDocument};

/// Scene documents held in memory, keyed by scene name.
///
/// A scene registered with a non-object JSON value loads as
/// `SceneError::MalformedGraph`, mirroring the file-backed store.
#[derive(Debug, Default)]
pub struct InMemorySceneDefinitions {
    scenes: BTreeMap<String, Value>,
}

impl InMemorySceneDefinitions {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `document` under `name`.
    #[must_use]
    pub fn with_scene(mut self, name: &str, document: Value) -> Self {
        self.scenes.insert(name.to_owned(), document);
        self
    }
}

#[async_trait]
impl SceneDefinitionRepository for InMemorySceneDefinitions {
    async fn load_document(&self, scene_name: &str) -> Result<SceneDocument, SceneError> {
        match self.scenes.get(scene_name) {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(SceneError::MalformedGraph(format!(
                "{scene_name}: top-level value is not an object"
            ))),
            None => Err(SceneError::NotFound(format!("scene {scene_name}"))),
        }
    }

    async fn list_scene_names(&self) -> Result<Vec<String>, SceneError> {
        Ok(self.scenes.keys().cloned().collect())
    }
}
