//! Command handlers for the Scene Coordination context.
//!
//! Each handler reads what it needs, computes the next state with the pure
//! transitions, and persists it with a single whole-record replace. A failed
//! handler never writes.

use tracing::{debug, info, warn};
use wispwell_core::clock::Clock;
use wispwell_core::error::SceneError;
use wispwell_core::repository::{SceneDefinitionRepository, SceneStateRepository};
use wispwell_core::state::StoredState;

use crate::domain::commands::{AdvanceScene, StartScene, StopScene};
use crate::domain::graph::{Node, SceneGraph};
use crate::domain::transitions::{self, Step};

/// Result of an advance request.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// There was no active scene; nothing was written.
    NoActiveScene,
    /// The scene had already moved past the expected node; nothing was written.
    Stale {
        /// The node the stored state actually points at.
        current_node: Option<String>,
    },
    /// The scene moved to a new node.
    Advanced {
        /// The node now due.
        node_id: String,
        /// Its content.
        node: Node,
        /// The revision written.
        revision: u64,
    },
    /// The previous node was terminal and the scene is now idle.
    Ended {
        /// The revision written.
        revision: u64,
    },
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No state had ever been written; nothing to stop.
    NothingToStop,
    /// The state was marked stopped at this revision.
    Stopped {
        /// The revision written.
        revision: u64,
    },
}

/// Loads and parses the graph for `scene_name`.
///
/// # Errors
///
/// Propagates `SceneError::NotFound`, `SceneError::MalformedGraph` and
/// `SceneError::Io` from the definition repository and the parser.
pub async fn load_graph(
    scene_name: &str,
    definitions: &dyn SceneDefinitionRepository,
) -> Result<SceneGraph, SceneError> {
    let document = definitions.load_document(scene_name).await?;
    SceneGraph::from_document(scene_name, &document)
}

/// Handles the `StartScene` command: loads the graph, builds a fresh active
/// state and overwrites whatever was stored.
///
/// # Errors
///
/// Returns `SceneError::NotFound` if the scene or starting node is missing,
/// `SceneError::MalformedGraph` if the graph cannot be used, and
/// `SceneError::Io` if the write fails. Prior state is untouched on error.
pub async fn handle_start_scene(
    command: &StartScene,
    clock: &dyn Clock,
    definitions: &dyn SceneDefinitionRepository,
    states: &dyn SceneStateRepository,
) -> Result<StoredState, SceneError> {
    let graph = load_graph(&command.scene_name, definitions).await?;
    let state = transitions::begin(&graph, &command.starting_node, clock.now())?;

    let revision = states.replace(&state, None).await?;

    info!(
        correlation_id = %command.correlation_id,
        scene = %command.scene_name,
        speaker = state.next_speaker.as_deref().unwrap_or_default(),
        revision,
        "scene started"
    );
    Ok(StoredState { revision, state })
}

/// Handles the `AdvanceScene` command: resolves the node after the current
/// one and writes it with a compare-and-swap against the revision read.
///
/// # Errors
///
/// Returns `SceneError::InvalidState` if the stored state or the graph cannot
/// resolve the next node, `SceneError::Conflict` if another writer got there
/// first, and `SceneError::Io` on storage failure. Nothing is written on error.
pub async fn handle_advance_scene(
    command: &AdvanceScene,
    clock: &dyn Clock,
    definitions: &dyn SceneDefinitionRepository,
    states: &dyn SceneStateRepository,
) -> Result<AdvanceOutcome, SceneError> {
    let Some(stored) = states.load().await? else {
        debug!(correlation_id = %command.correlation_id, "no scene state to advance");
        return Ok(AdvanceOutcome::NoActiveScene);
    };
    if !stored.state.scene_active {
        debug!(correlation_id = %command.correlation_id, "no active scene to advance");
        return Ok(AdvanceOutcome::NoActiveScene);
    }

    if let Some(expected) = &command.expected_node {
        if stored.state.current_node.as_ref() != Some(expected) {
            warn!(
                correlation_id = %command.correlation_id,
                expected = %expected,
                actual = stored.state.current_node.as_deref().unwrap_or_default(),
                "advance skipped: scene already moved on"
            );
            return Ok(AdvanceOutcome::Stale {
                current_node: stored.state.current_node.clone(),
            });
        }
    }

    stored.state.check_invariants()?;
    let (Some(scene_name), Some(current_node)) =
        (&stored.state.scene, &stored.state.current_node)
    else {
        return Err(SceneError::InvalidState(
            "active state without scene or current_node".into(),
        ));
    };

    let graph = load_graph(scene_name, definitions)
        .await
        .map_err(|e| match e {
            SceneError::NotFound(what) => {
                SceneError::InvalidState(format!("active scene is no longer available: {what}"))
            }
            other => other,
        })?;
    let step = transitions::next_step(&graph, current_node)?;
    let next_state = transitions::apply_step(&stored.state, &step, clock.now());

    let revision = states.replace(&next_state, Some(stored.revision)).await?;

    match step {
        Step::Continue { node_id, speaker } => {
            info!(
                correlation_id = %command.correlation_id,
                scene = %scene_name,
                node = %node_id,
                speaker = %speaker,
                revision,
                "scene advanced"
            );
            let node = graph
                .node(&node_id)
                .cloned()
                .ok_or_else(|| SceneError::InvalidState(format!("node '{node_id}' vanished")))?;
            Ok(AdvanceOutcome::Advanced {
                node_id,
                node,
                revision,
            })
        }
        Step::End => {
            info!(
                correlation_id = %command.correlation_id,
                scene = %scene_name,
                revision,
                "scene ended"
            );
            Ok(AdvanceOutcome::Ended { revision })
        }
    }
}

/// Handles the `StopScene` command. Idempotent: stopping an idle or missing
/// scene still succeeds.
///
/// # Errors
///
/// Returns `SceneError::Io` if the state cannot be read or written.
pub async fn handle_stop_scene(
    command: &StopScene,
    clock: &dyn Clock,
    states: &dyn SceneStateRepository,
) -> Result<StopOutcome, SceneError> {
    let Some(stored) = states.load().await? else {
        debug!(correlation_id = %command.correlation_id, "no scene state to stop");
        return Ok(StopOutcome::NothingToStop);
    };

    let stopped = transitions::halt(&stored.state, clock.now());
    let revision = states.replace(&stopped, None).await?;

    info!(correlation_id = %command.correlation_id, revision, "scene stopped");
    Ok(StopOutcome::Stopped { revision })
}
