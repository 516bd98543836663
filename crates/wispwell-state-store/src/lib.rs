//! Wispwell State Store: storage backends.
//!
//! Scene definitions are read from a directory of JSON files. The shared
//! scene state lives either in a single JSON file replaced atomically or in
//! a single SQLite row guarded by a revision column.

pub mod file_definition_repository;
pub mod file_state_repository;
pub mod schema;
pub mod sqlite_state_repository;
