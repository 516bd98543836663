//! Wispwell: Scene Coordination bounded context.
//!
//! Owns the scene graph model and the only logic allowed to compute the next
//! shared state from the current one: start, advance, stop, status and
//! validation.

pub mod application;
pub mod domain;
