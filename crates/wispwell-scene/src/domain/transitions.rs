//! Pure state transitions of the scene turn machine.
//!
//! `Idle -> Active` via [`begin`], `Active -> Active` or `Active -> Idle` via
//! [`next_step`] and [`apply_step`], and `Active -> Idle` via [`halt`]. None of
//! these functions touch storage; the command handlers persist their results.

use chrono::{DateTime, Utc};
use wispwell_core::error::SceneError;
use wispwell_core::state::SceneState;

use super::graph::SceneGraph;

/// Where the scene goes after its current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Move to `node_id`, spoken by `speaker`.
    Continue {
        /// The node the scene moves to.
        node_id: String,
        /// The declared speaker of that node.
        speaker: String,
    },
    /// The current node is terminal; the scene ends.
    End,
}

/// Builds the fresh active state for a scene entered at `starting_node`.
///
/// Any previous state is discarded, including its lifecycle timestamps.
///
/// # Errors
///
/// Returns `SceneError::NotFound` if the node does not exist and
/// `SceneError::MalformedGraph` if it declares no speaker.
pub fn begin(
    graph: &SceneGraph,
    starting_node: &str,
    now: DateTime<Utc>,
) -> Result<SceneState, SceneError> {
    let node = graph.node(starting_node).ok_or_else(|| {
        SceneError::NotFound(format!(
            "starting node '{starting_node}' in scene {}",
            graph.name()
        ))
    })?;
    let speaker = node.declared_speaker().ok_or_else(|| {
        SceneError::MalformedGraph(format!(
            "starting node '{starting_node}' in scene {} has no speaker",
            graph.name()
        ))
    })?;

    Ok(SceneState {
        scene: Some(graph.name().to_owned()),
        current_node: Some(starting_node.to_owned()),
        next_speaker: Some(speaker.to_owned()),
        waiting_for_choice: false,
        scene_active: true,
        started_at: Some(now),
        ended_at: None,
        stopped_at: None,
    })
}

/// Resolves the step that follows `current_node`.
///
/// # Errors
///
/// Returns `SceneError::InvalidState` if the current node, its resolved
/// successor, or the successor's speaker cannot be found.
pub fn next_step(graph: &SceneGraph, current_node: &str) -> Result<Step, SceneError> {
    let node = graph.node(current_node).ok_or_else(|| {
        SceneError::InvalidState(format!(
            "current node '{current_node}' not found in scene {}",
            graph.name()
        ))
    })?;

    let Some(rule) = &node.next else {
        return Ok(Step::End);
    };

    let target = rule.resolve().ok_or_else(|| {
        SceneError::InvalidState(format!(
            "node '{current_node}' has an empty choice mapping"
        ))
    })?;
    let next = graph.node(target).ok_or_else(|| {
        SceneError::InvalidState(format!(
            "next node '{target}' not found in scene {}",
            graph.name()
        ))
    })?;
    let speaker = next.declared_speaker().ok_or_else(|| {
        SceneError::InvalidState(format!("next node '{target}' has no speaker"))
    })?;

    Ok(Step::Continue {
        node_id: target.to_owned(),
        speaker: speaker.to_owned(),
    })
}

/// Applies a resolved step to the current state.
#[must_use]
pub fn apply_step(state: &SceneState, step: &Step, now: DateTime<Utc>) -> SceneState {
    let mut next = state.clone();
    match step {
        Step::Continue { node_id, speaker } => {
            next.current_node = Some(node_id.clone());
            next.next_speaker = Some(speaker.clone());
            next.waiting_for_choice = false;
        }
        Step::End => {
            next.scene_active = false;
            next.current_node = None;
            next.next_speaker = None;
            next.ended_at = Some(now);
        }
    }
    next
}

/// Stops the scene described by `state`, stamping `stopped_at`.
#[must_use]
pub fn halt(state: &SceneState, now: DateTime<Utc>) -> SceneState {
    SceneState {
        scene_active: false,
        current_node: None,
        next_speaker: None,
        stopped_at: Some(now),
        ..state.clone()
    }
}
