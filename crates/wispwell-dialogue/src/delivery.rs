//! Delivery that writes dialogue lines to the log.

use async_trait::async_trait;
use tracing::info;
use wispwell_core::delivery::Delivery;
use wispwell_core::error::DeliveryError;

/// Renders a line the way it appears in the channel.
#[must_use]
pub fn format_line(speaker: &str, text: &str) -> String {
    format!("**{speaker}:** {text}")
}

/// Emits every line as a structured `info` event. Used by hosts that run
/// without a chat transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDelivery;

#[async_trait]
impl Delivery for TracingDelivery {
    async fn deliver(&self, speaker: &str, text: &str) -> Result<(), DeliveryError> {
        info!(speaker, line = %format_line(speaker, text), "dialogue line");
        Ok(())
    }
}
