//! `SQLite` implementation of the `SceneStateRepository` trait.
//!
//! The record is a single row; the revision column makes compare-and-swap a
//! conditional `UPDATE`, which `SQLite` executes atomically even when several
//! processes share the database file.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;
use wispwell_core::error::SceneError;
use wispwell_core::repository::SceneStateRepository;
use wispwell_core::state::{SceneState, StoredState};

use crate::schema::CREATE_SCENE_STATE_TABLE;

fn storage_error(err: sqlx::Error) -> SceneError {
    SceneError::Io(format!("sqlite: {err}"))
}

fn to_revision(raw: i64) -> Result<u64, SceneError> {
    u64::try_from(raw).map_err(|_| SceneError::Io(format!("negative revision {raw} in store")))
}

/// SQLite-backed scene state repository.
#[derive(Debug, Clone)]
pub struct SqliteSceneStateRepository {
    pool: SqlitePool,
}

impl SqliteSceneStateRepository {
    /// Creates a repository over an existing pool. Call
    /// [`Self::ensure_schema`] before first use.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url` and ensures
    /// the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Io` if the URL is invalid or the database cannot
    /// be opened or migrated.
    pub async fn connect(database_url: &str) -> Result<Self, SceneError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Creates the scene state table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `SceneError::Io` if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), SceneError> {
        sqlx::query(CREATE_SCENE_STATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn current_revision(&self) -> Result<u64, SceneError> {
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM scene_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;
        revision.map_or(Ok(0), to_revision)
    }
}

#[async_trait]
impl SceneStateRepository for SqliteSceneStateRepository {
    async fn load(&self) -> Result<Option<StoredState>, SceneError> {
        let row = sqlx::query("SELECT revision, document FROM scene_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let revision: i64 = row.try_get("revision").map_err(storage_error)?;
        let document: String = row.try_get("document").map_err(storage_error)?;
        let state: SceneState = serde_json::from_str(&document)
            .map_err(|e| SceneError::Io(format!("corrupt scene state row: {e}")))?;
        Ok(Some(StoredState {
            revision: to_revision(revision)?,
            state,
        }))
    }

    async fn replace(
        &self,
        state: &SceneState,
        expected_revision: Option<u64>,
    ) -> Result<u64, SceneError> {
        let document = serde_json::to_string(state)
            .map_err(|e| SceneError::Io(format!("state serialization failed: {e}")))?;

        let written: Option<i64> = match expected_revision {
            None => Some(
                sqlx::query_scalar(
                    "INSERT INTO scene_state (id, revision, document) VALUES (1, 1, ?1) \
                     ON CONFLICT(id) DO UPDATE SET revision = scene_state.revision + 1, \
                     document = excluded.document \
                     RETURNING revision",
                )
                .bind(&document)
                .fetch_one(&self.pool)
                .await
                .map_err(storage_error)?,
            ),
            Some(0) => sqlx::query_scalar(
                "INSERT INTO scene_state (id, revision, document) VALUES (1, 1, ?1) \
                 ON CONFLICT(id) DO NOTHING \
                 RETURNING revision",
            )
            .bind(&document)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?,
            Some(expected) => {
                let expected = i64::try_from(expected)
                    .map_err(|_| SceneError::Io(format!("revision {expected} out of range")))?;
                sqlx::query_scalar(
                    "UPDATE scene_state SET revision = revision + 1, document = ?1 \
                     WHERE id = 1 AND revision = ?2 \
                     RETURNING revision",
                )
                .bind(&document)
                .bind(expected)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?
            }
        };

        match written {
            Some(revision) => {
                debug!(revision, "saved scene state");
                to_revision(revision)
            }
            None => Err(SceneError::Conflict {
                expected: expected_revision.unwrap_or_default(),
                actual: self.current_revision().await?,
            }),
        }
    }
}
