//! Scene state database schema.

/// SQL to create the single-row scene state table.
pub const CREATE_SCENE_STATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS scene_state (
    id       INTEGER PRIMARY KEY CHECK (id = 1),
    revision INTEGER NOT NULL,
    document TEXT NOT NULL
);
";
