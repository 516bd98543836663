//! Error taxonomy shared by the coordinator, the stores and the participants.

use thiserror::Error;

/// Failure of a scene coordination operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// A scene file or a node within it does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A scene file is not valid JSON or violates the node structure.
    #[error("malformed scene graph: {0}")]
    MalformedGraph(String),

    /// The shared state points at something the graph cannot resolve.
    #[error("invalid scene state: {0}")]
    InvalidState(String),

    /// A compare-and-swap write lost against a concurrent writer.
    #[error("scene state conflict: expected revision {expected}, found {actual}")]
    Conflict {
        /// Revision the writer read before computing its update.
        expected: u64,
        /// Revision found in the store at write time.
        actual: u64,
    },

    /// The storage medium failed to read or write.
    #[error("storage failure: {0}")]
    Io(String),

    /// The operation was interrupted by a shutdown signal.
    #[error("cancelled")]
    Cancelled,
}

impl From<std::io::Error> for SceneError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Failure to emit a line of dialogue to the external channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The target channel could not be reached.
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    /// The channel refused the message (permissions, size limits).
    #[error("message rejected: {0}")]
    Rejected(String),
}
