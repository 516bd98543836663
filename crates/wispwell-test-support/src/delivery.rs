//! Test deliveries: mock `Delivery` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use wispwell_core::delivery::Delivery;
use wispwell_core::error::DeliveryError;

/// Records every `(speaker, text)` pair it is asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingDelivery {
    delivered: Mutex<Vec<(String, String)>>,
}

impl RecordingDelivery {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all delivered lines, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn deliver(&self, speaker: &str, text: &str) -> Result<(), DeliveryError> {
        self.delivered
            .lock()
            .unwrap()
            .push((speaker.to_owned(), text.to_owned()));
        Ok(())
    }
}

/// A delivery that always fails as if the channel were missing.
#[derive(Debug)]
pub struct FailingDelivery;

#[async_trait]
impl Delivery for FailingDelivery {
    async fn deliver(&self, _speaker: &str, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Unavailable("channel not found".into()))
    }
}
