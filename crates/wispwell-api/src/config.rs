//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use wispwell_dialogue::settings::PollSettings;

use crate::error::AppError;

/// Scene started when a start request names none.
pub const DEFAULT_SCENE: &str = "scene1_orlin.json";

/// Where the shared scene state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    /// A JSON file replaced atomically on every write.
    File,
    /// A single-row `SQLite` table.
    Sqlite,
}

impl FromStr for StateBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(AppError::Config(format!(
                "STATE_BACKEND must be 'file' or 'sqlite', got '{other}'"
            ))),
        }
    }
}

/// Settings shared by the API host and the participant host.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub scene_dir: PathBuf,
    pub state_backend: StateBackend,
    pub state_file: PathBuf,
    pub database_url: String,
    /// Scene started when a start request names none.
    pub default_scene: String,
    /// Characters whose turn participants run in this process.
    pub participants: Vec<String>,
    pub poll: PollSettings,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let port = var("PORT", "3000")
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let defaults = PollSettings::default();
        let poll = PollSettings {
            poll_interval: positive_seconds(
                &lookup,
                "SCENE_CHECK_INTERVAL",
                defaults.poll_interval,
            )?,
            error_backoff: positive_seconds(
                &lookup,
                "SCENE_ERROR_BACKOFF",
                defaults.error_backoff,
            )?,
            failure_threshold: defaults.failure_threshold,
            default_wait: seconds(&lookup, "DEFAULT_SCENE_WAIT", defaults.default_wait)?,
        };
        let participants = lookup("PARTICIPANTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port,
            scene_dir: PathBuf::from(var("SCENE_DIR", "./shared/dialogue")),
            state_backend: var("STATE_BACKEND", "file").parse()?,
            state_file: PathBuf::from(var("SCENE_STATE_FILE", "./shared/scene_state.json")),
            database_url: var("DATABASE_URL", "sqlite://./shared/scene_state.db"),
            default_scene: var("DEFAULT_SCENE", DEFAULT_SCENE),
            participants,
            poll,
        })
    }

    /// The address the command surface listens on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AppError::Config(format!("{key} must be whole seconds: {e}"))),
    }
}

/// Like [`seconds`], but zero is rejected; polling needs a real delay.
fn positive_seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Result<Duration, AppError> {
    let value = seconds(lookup, key, default)?;
    if value.is_zero() {
        return Err(AppError::Config(format!("{key} must be at least 1 second")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.scene_dir, PathBuf::from("./shared/dialogue"));
        assert_eq!(config.state_backend, StateBackend::File);
        assert_eq!(config.state_file, PathBuf::from("./shared/scene_state.json"));
        assert_eq!(config.default_scene, "scene1_orlin.json");
        assert!(config.participants.is_empty());
        assert_eq!(config.poll, PollSettings::default());
        assert_eq!(config.poll.default_wait, Duration::from_secs(2));
    }

    #[test]
    fn test_overrides_are_applied() {
        // Arrange
        let vars = [
            ("PORT", "8080"),
            ("STATE_BACKEND", "SQLite"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("PARTICIPANTS", " Orlin, Elroi,,CloudBelle "),
            ("SCENE_CHECK_INTERVAL", "1"),
            ("SCENE_ERROR_BACKOFF", "10"),
            ("DEFAULT_SCENE_WAIT", "0"),
            ("DEFAULT_SCENE", "scene2_cloudbelle.json"),
        ];

        // Act
        let config = config_from(&vars).unwrap();

        // Assert
        assert_eq!(config.port, 8080);
        assert_eq!(config.state_backend, StateBackend::Sqlite);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.participants, vec!["Orlin", "Elroi", "CloudBelle"]);
        assert_eq!(config.poll.poll_interval, Duration::from_secs(1));
        assert_eq!(config.poll.error_backoff, Duration::from_secs(10));
        assert_eq!(config.poll.failure_threshold, 2);
        assert_eq!(config.poll.default_wait, Duration::ZERO);
        assert_eq!(config.default_scene, "scene2_cloudbelle.json");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("PORT", "eighty")],
            [("STATE_BACKEND", "redis")],
            [("SCENE_CHECK_INTERVAL", "-3")],
            [("SCENE_ERROR_BACKOFF", "2.5")],
            [("SCENE_CHECK_INTERVAL", "0")],
            [("SCENE_ERROR_BACKOFF", "0")],
            [("DEFAULT_SCENE_WAIT", "soon")],
        ] {
            assert!(
                matches!(config_from(&vars), Err(AppError::Config(_))),
                "{vars:?}"
            );
        }
    }

    #[test]
    fn test_bind_addr_rejects_bad_host() {
        let mut config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr().unwrap().port(), 3000);

        config.host = "not a host".into();
        assert!(config.bind_addr().is_err());
    }
}
