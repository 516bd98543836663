//! Query handlers for the Scene Coordination context.
//!
//! Queries never fail: storage errors are logged and folded into the
//! returned view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;
use wispwell_core::repository::{SceneDefinitionRepository, SceneStateRepository};

use crate::domain::validation::{ValidationReport, validate_document};

/// Read-only snapshot of the shared scene state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneStatus {
    /// Whether a scene is in progress.
    pub active: bool,
    /// The scene last started.
    pub scene: Option<String>,
    /// The node currently due.
    pub current_node: Option<String>,
    /// The participant expected to act.
    pub next_speaker: Option<String>,
    /// Reserved for branch nodes awaiting input.
    pub waiting_for_choice: bool,
    /// When the scene was started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the scene reached its end.
    pub ended_at: Option<DateTime<Utc>>,
    /// When the scene was stopped.
    pub stopped_at: Option<DateTime<Utc>>,
    /// Store revision the snapshot was read at.
    pub revision: u64,
    /// Why the snapshot is degraded, if it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reads the current scene status.
pub async fn get_scene_status(states: &dyn SceneStateRepository) -> SceneStatus {
    match states.load().await {
        Ok(None) => SceneStatus::default(),
        Ok(Some(stored)) => SceneStatus {
            active: stored.state.scene_active,
            scene: stored.state.scene,
            current_node: stored.state.current_node,
            next_speaker: stored.state.next_speaker,
            waiting_for_choice: stored.state.waiting_for_choice,
            started_at: stored.state.started_at,
            ended_at: stored.state.ended_at,
            stopped_at: stored.state.stopped_at,
            revision: stored.revision,
            error: None,
        },
        Err(e) => {
            error!(error = %e, "failed to read scene status");
            SceneStatus {
                error: Some(e.to_string()),
                ..SceneStatus::default()
            }
        }
    }
}

/// Lists the scenes available to start, sorted by name.
pub async fn list_available_scenes(definitions: &dyn SceneDefinitionRepository) -> Vec<String> {
    match definitions.list_scene_names().await {
        Ok(mut names) => {
            names.sort();
            names
        }
        Err(e) => {
            error!(error = %e, "failed to list scenes");
            Vec::new()
        }
    }
}

/// Validates the structure of `scene_name`.
pub async fn validate_scene(
    scene_name: &str,
    definitions: &dyn SceneDefinitionRepository,
) -> ValidationReport {
    match definitions.load_document(scene_name).await {
        Ok(document) => validate_document(&document),
        Err(e) => ValidationReport::unloadable(&e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wispwell_core::state::SceneState;
    use wispwell_test_support::{
        FailingSceneStateRepository, InMemorySceneDefinitions, InMemorySceneStateRepository,
    };

    use super::*;

    #[tokio::test]
    async fn test_get_scene_status_without_record_is_inactive() {
        let status = get_scene_status(&InMemorySceneStateRepository::new()).await;

        assert_eq!(status, SceneStatus::default());
    }

    #[tokio::test]
    async fn test_get_scene_status_mirrors_record() {
        // Arrange
        let repo = InMemorySceneStateRepository::with_state(SceneState {
            scene: Some("g.json".into()),
            current_node: Some("start".into()),
            next_speaker: Some("A".into()),
            scene_active: true,
            ..SceneState::default()
        });

        // Act
        let status = get_scene_status(&repo).await;

        // Assert
        assert!(status.active);
        assert_eq!(status.scene.as_deref(), Some("g.json"));
        assert_eq!(status.next_speaker.as_deref(), Some("A"));
        assert_eq!(status.revision, 1);
        assert!(status.error.is_none());
    }

    #[tokio::test]
    async fn test_get_scene_status_degrades_on_storage_failure() {
        let status = get_scene_status(&FailingSceneStateRepository).await;

        assert!(!status.active);
        assert_eq!(
            status.error.as_deref(),
            Some("storage failure: connection refused")
        );
    }

    #[tokio::test]
    async fn test_list_available_scenes_is_sorted() {
        let defs = InMemorySceneDefinitions::new()
            .with_scene("scene2_cloudbelle.json", json!({}))
            .with_scene("scene1_orlin.json", json!({}));

        let names = list_available_scenes(&defs).await;

        assert_eq!(names, vec!["scene1_orlin.json", "scene2_cloudbelle.json"]);
    }

    #[tokio::test]
    async fn test_validate_scene_reports_missing_file() {
        let report = validate_scene("missing.json", &InMemorySceneDefinitions::new()).await;

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_scene_reports_malformed_file() {
        let defs = InMemorySceneDefinitions::new().with_scene("list.json", json!([1, 2]));

        let report = validate_scene("list.json", &defs).await;

        assert!(!report.valid);
        assert!(report.errors[0].contains("not an object"));
    }
}
