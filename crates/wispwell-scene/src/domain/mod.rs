//! Domain layer for the Scene Coordination context.

pub mod commands;
pub mod graph;
pub mod transitions;
pub mod validation;
