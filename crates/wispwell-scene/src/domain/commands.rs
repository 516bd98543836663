//! Commands for the Scene Coordination context.

use uuid::Uuid;

/// Command to start (or restart) a scene at a given node.
#[derive(Debug, Clone)]
pub struct StartScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The scene file name, e.g. `scene1_orlin.json`.
    pub scene_name: String,
    /// The node the scene begins at.
    pub starting_node: String,
}

/// Command to move the active scene past its current node.
#[derive(Debug, Clone)]
pub struct AdvanceScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// When set, advance only if the stored `current_node` still equals it.
    pub expected_node: Option<String>,
}

/// Command to stop whatever scene is in progress.
#[derive(Debug, Clone)]
pub struct StopScene {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}
