//! The shared scene state record.
//!
//! One `SceneState` exists per deployment. Every participant process reads
//! it; only coordinator operations replace it.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SceneError;

/// The turn machine's current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneState {
    /// Name of the active scene graph.
    pub scene: Option<String>,
    /// Node within the scene whose line is due next.
    pub current_node: Option<String>,
    /// Participant expected to act on `current_node`.
    pub next_speaker: Option<String>,
    /// Reserved for branch nodes awaiting external input.
    #[serde(default)]
    pub waiting_for_choice: bool,
    /// Whether a scene is in progress.
    #[serde(default)]
    pub scene_active: bool,
    /// When the scene was last started.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the scene reached a terminal node.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub ended_at: Option<DateTime<Utc>>,
    /// When the scene was stopped explicitly.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl SceneState {
    /// Returns the participant whose turn it is, if a scene is active.
    #[must_use]
    pub fn speaker_due(&self) -> Option<&str> {
        if self.scene_active {
            self.next_speaker.as_deref()
        } else {
            None
        }
    }

    /// Checks the record-level invariants: an active state names its scene,
    /// node and speaker; an idle state names neither node nor speaker.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::InvalidState` describing the first violation.
    pub fn check_invariants(&self) -> Result<(), SceneError> {
        if self.scene_active {
            if self.scene.is_none() {
                return Err(SceneError::InvalidState("active state without scene".into()));
            }
            if self.current_node.is_none() {
                return Err(SceneError::InvalidState(
                    "active state without current_node".into(),
                ));
            }
            if self.next_speaker.is_none() {
                return Err(SceneError::InvalidState(
                    "active state without next_speaker".into(),
                ));
            }
        } else if self.current_node.is_some() || self.next_speaker.is_some() {
            return Err(SceneError::InvalidState(
                "idle state still names a node or speaker".into(),
            ));
        }
        Ok(())
    }
}

/// Reads an optional timestamp written with or without a UTC offset.
///
/// Offset-less values are taken as UTC. An unparseable value reads as absent
/// so one bad field does not hide the rest of the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    Ok(raw
        .parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())))
}

/// A `SceneState` together with the store revision it was read at.
///
/// Revision `0` means no record has ever been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredState {
    /// Monotonic write counter maintained by the store.
    pub revision: u64,
    /// The record contents.
    pub state: SceneState,
}
