//! Application layer for the Scene Coordination context.

pub mod command_handlers;
pub mod coordinator;
pub mod query_handlers;
