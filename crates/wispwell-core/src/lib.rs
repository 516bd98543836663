//! Wispwell Core: shared abstractions for scene coordination.
//!
//! This crate defines the record every participant process shares, the
//! storage and delivery seams, and the error taxonomy. It contains no
//! infrastructure code.

pub mod clock;
pub mod delivery;
pub mod error;
pub mod repository;
pub mod state;
