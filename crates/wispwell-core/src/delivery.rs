//! Outbound seam for emitting dialogue lines.

use async_trait::async_trait;

use crate::error::DeliveryError;

/// Emits a participant's line to the external channel.
///
/// Implementations may fail; the turn participant logs the failure and still
/// advances the scene after the node's wait.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Sends `text` on behalf of `speaker`.
    async fn deliver(&self, speaker: &str, text: &str) -> Result<(), DeliveryError>;
}
