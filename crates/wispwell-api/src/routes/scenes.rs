//! Routes for the Scene Coordination bounded context.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use wispwell_scene::application::command_handlers::{AdvanceOutcome, StopOutcome};
use wispwell_scene::application::query_handlers::SceneStatus;
use wispwell_scene::domain::graph::START_NODE;
use wispwell_scene::domain::validation::ValidationReport;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /start.
#[derive(Debug, Deserialize)]
pub struct StartSceneRequest {
    /// Scene file name, e.g. `scene1_orlin.json`; defaults to the host's
    /// configured scene.
    #[serde(default)]
    pub scene_name: Option<String>,
    /// Node to begin at; defaults to `start`.
    #[serde(default = "default_starting_node")]
    pub starting_node: String,
}

fn default_starting_node() -> String {
    START_NODE.to_owned()
}

/// Response body for scene commands.
#[derive(Debug, Serialize)]
pub struct CommandReply {
    /// Whether the command changed the scene as asked.
    pub success: bool,
    pub message: String,
    /// Store revision written by the command, if it wrote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl CommandReply {
    fn ok(message: String, revision: Option<u64>) -> Self {
        Self {
            success: true,
            message,
            revision,
        }
    }

    fn declined(message: String) -> Self {
        Self {
            success: false,
            message,
            revision: None,
        }
    }
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct SceneList {
    pub scenes: Vec<String>,
}

/// POST /start
#[instrument(skip_all, fields(scene_name = tracing::field::Empty))]
async fn start_scene(
    State(state): State<AppState>,
    Json(request): Json<StartSceneRequest>,
) -> Result<Json<CommandReply>, ApiError> {
    let scene_name = request
        .scene_name
        .unwrap_or_else(|| state.default_scene.to_string());
    tracing::Span::current().record("scene_name", scene_name.as_str());

    let stored = state
        .coordinator
        .start(&scene_name, &request.starting_node)
        .await?;

    info!(revision = stored.revision, "scene started");

    Ok(Json(CommandReply::ok(
        format!("Scene '{scene_name}' started at '{}'.", request.starting_node),
        Some(stored.revision),
    )))
}

/// POST /stop
#[instrument(skip(state))]
async fn stop_scene(State(state): State<AppState>) -> Result<Json<CommandReply>, ApiError> {
    let reply = match state.coordinator.stop().await? {
        StopOutcome::NothingToStop => CommandReply::ok("No scene to stop.".into(), None),
        StopOutcome::Stopped { revision } => {
            info!(revision, "scene stopped");
            CommandReply::ok("Scene stopped.".into(), Some(revision))
        }
    };
    Ok(Json(reply))
}

/// POST /advance
#[instrument(skip(state))]
async fn advance_scene(State(state): State<AppState>) -> Result<Json<CommandReply>, ApiError> {
    let reply = match state.coordinator.advance().await? {
        AdvanceOutcome::NoActiveScene => CommandReply::declined("No active scene.".into()),
        AdvanceOutcome::Stale { current_node } => CommandReply::declined(format!(
            "Scene already moved on to {}.",
            current_node.as_deref().unwrap_or("nothing")
        )),
        AdvanceOutcome::Advanced {
            node_id,
            node,
            revision,
        } => CommandReply::ok(
            format!(
                "Advanced to '{node_id}', {} speaks next.",
                node.speaker.as_deref().unwrap_or("nobody")
            ),
            Some(revision),
        ),
        AdvanceOutcome::Ended { revision } => {
            CommandReply::ok("Scene ended.".into(), Some(revision))
        }
    };
    Ok(Json(reply))
}

/// GET /status
async fn scene_status(State(state): State<AppState>) -> Json<SceneStatus> {
    Json(state.coordinator.status().await)
}

/// GET /
async fn list_scenes(State(state): State<AppState>) -> Json<SceneList> {
    Json(SceneList {
        scenes: state.coordinator.list_available_scenes().await,
    })
}

/// GET /{scene_name}/validate
#[instrument(skip(state))]
async fn validate_scene(
    State(state): State<AppState>,
    Path(scene_name): Path<String>,
) -> Json<ValidationReport> {
    Json(state.coordinator.validate(&scene_name).await)
}

/// Returns the router for the scene context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_scenes))
        .route("/start", post(start_scene))
        .route("/stop", post(stop_scene))
        .route("/advance", post(advance_scene))
        .route("/status", get(scene_status))
        .route("/{scene_name}/validate", get(validate_scene))
}
