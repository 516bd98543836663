//! Shared test mocks and utilities for Wispwell scene coordination.

mod clock;
mod definitions;
mod delivery;
mod repository;

pub use clock::FixedClock;
pub use definitions::InMemorySceneDefinitions;
pub use delivery::{FailingDelivery, RecordingDelivery};
pub use repository::{FailingSceneStateRepository, InMemorySceneStateRepository};
