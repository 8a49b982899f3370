//! Configuration loading
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Global config: `config.toml` in the platform config dir for `setlog`
//! 3. Explicit config file (`--config <path>`)
//! 4. Environment variables: `SETLOG_*`
//!
//! File layers are merged key by key, so a file only needs the keys it
//! changes.
//!
//! # Example Config
//!
//! ```toml
//! [database]
//! path = "/var/lib/setlog/setlog.db"
//! max_connections = 4
//! busy_timeout_ms = 5000
//!
//! [log]
//! level = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const ENV_DB_PATH: &str = "SETLOG_DB_PATH";
const ENV_DB_MAX_CONNECTIONS: &str = "SETLOG_DB_MAX_CONNECTIONS";
const ENV_DB_BUSY_TIMEOUT_MS: &str = "SETLOG_DB_BUSY_TIMEOUT_MS";
const ENV_LOG_LEVEL: &str = "SETLOG_LOG_LEVEL";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; created on first use
    pub path: PathBuf,
    pub max_connections: u32,
    /// How long a writer waits for the `SQLite` lock
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from all layers.
///
/// # Errors
///
/// Returns error if:
/// - A config file cannot be read or is malformed TOML
/// - An explicit config file does not exist
/// - An environment variable holds an unparsable value
/// - The merged values fail validation
pub async fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global = global_config_path().ok().filter(|path| path.exists());
    load_layers(global.as_deref(), explicit).await
}

async fn load_layers(global: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
    let mut merged = toml::Value::try_from(Config::default())
        .map_err(|e| Error::invalid_config(format!("Failed to encode defaults: {e}")))?;

    if let Some(path) = global {
        merge_values(&mut merged, load_toml_file(path).await?);
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::io_error(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        merge_values(&mut merged, load_toml_file(path).await?);
    }

    let mut config: Config = merged
        .try_into()
        .map_err(|e| Error::invalid_config(format!("Failed to decode config: {e}")))?;

    config.apply_env_vars()?;
    config.validate()?;
    Ok(config)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Path of the global config file.
///
/// # Errors
///
/// Returns error if the platform config directory cannot be determined.
pub fn global_config_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "setlog")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or_else(|| Error::io_error("Failed to determine global config directory"))
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "setlog").map_or_else(
        || PathBuf::from("setlog.db"),
        |dirs| dirs.data_dir().join("setlog.db"),
    )
}

async fn load_toml_file(path: &Path) -> Result<toml::Value> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::io_error(format!(
            "Failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::parse_error(format!("Failed to parse config {}: {e}", path.display()))
    })
}

/// Overlay `overlay` onto `base`; tables merge recursively, anything else
/// replaces.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(name)
        .ok()
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| Error::invalid_config(format!("Invalid {name} value '{value}': {e}")))
        })
        .transpose()
}

impl Config {
    /// Apply `SETLOG_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a numeric variable does not parse.
    fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(ENV_DB_PATH) {
            self.database.path = PathBuf::from(value);
        }
        if let Some(value) = env_parse(ENV_DB_MAX_CONNECTIONS)? {
            self.database.max_connections = value;
        }
        if let Some(value) = env_parse(ENV_DB_BUSY_TIMEOUT_MS)? {
            self.database.busy_timeout_ms = value;
        }
        if let Ok(value) = std::env::var(ENV_LOG_LEVEL) {
            self.log.level = value.trim().to_lowercase();
        }
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any values are out of range or invalid
    pub fn validate(&self) -> Result<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(Error::invalid_config("database.path must not be empty"));
        }

        if !(1..=64).contains(&self.database.max_connections) {
            return Err(Error::invalid_config(
                "database.max_connections must be 1-64",
            ));
        }

        if self.database.busy_timeout_ms > 600_000 {
            return Err(Error::invalid_config(
                "database.busy_timeout_ms must be at most 600000",
            ));
        }

        if !LOG_LEVELS.contains(&self.log.level.as_str()) {
            return Err(Error::invalid_config(format!(
                "log.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log.level
            )));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    fn clear_env() {
        for name in [
            ENV_DB_PATH,
            ENV_DB_MAX_CONNECTIONS,
            ENV_DB_BUSY_TIMEOUT_MS,
            ENV_LOG_LEVEL,
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.log.level, "info");
        assert!(config.database.path.ends_with("setlog.db"));
    }

    #[tokio::test]
    #[serial]
    async fn test_no_files_returns_defaults() {
        clear_env();
        let config = load_layers(None, None).await.expect("defaults load");
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    #[serial]
    async fn test_partial_file_overrides_only_its_keys() {
        clear_env();
        let file = write_config("[database]\nbusy_timeout_ms = 250\n");

        let config = load_layers(None, Some(file.path())).await.expect("load");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.log.level, "info");
    }

    #[tokio::test]
    #[serial]
    async fn test_explicit_file_overrides_global() {
        clear_env();
        let global = write_config("[database]\npath = \"global.db\"\nmax_connections = 2\n");
        let explicit = write_config("[database]\npath = \"explicit.db\"\n");

        let config = load_layers(Some(global.path()), Some(explicit.path()))
            .await
            .expect("load");
        assert_eq!(config.database.path, PathBuf::from("explicit.db"));
        assert_eq!(config.database.max_connections, 2);
    }

    #[tokio::test]
    #[serial]
    async fn test_malformed_file_is_parse_error() {
        clear_env();
        let file = write_config("[database\npath = ");
        let result = load_layers(None, Some(file.path())).await;
        assert!(matches!(result, Err(Error::ParseError(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_explicit_file_is_error() {
        clear_env();
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_layers(None, Some(dir.path().join("absent.toml").as_path())).await;
        assert!(matches!(result, Err(Error::IoError(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_vars_override_files() {
        clear_env();
        let file = write_config("[log]\nlevel = \"warn\"\n");
        std::env::set_var(ENV_DB_PATH, "/tmp/from-env.db");
        std::env::set_var(ENV_LOG_LEVEL, "DEBUG");
        std::env::set_var(ENV_DB_MAX_CONNECTIONS, "8");

        let result = load_layers(None, Some(file.path())).await;
        clear_env();

        let config = result.expect("load");
        assert_eq!(config.database.path, PathBuf::from("/tmp/from-env.db"));
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.log.level, "debug");
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_env_value_is_rejected() {
        clear_env();
        std::env::set_var(ENV_DB_BUSY_TIMEOUT_MS, "soon");
        let result = load_layers(None, None).await;
        clear_env();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_out_of_range_value_fails_validation() {
        clear_env();
        let file = write_config("[database]\nmax_connections = 0\n");
        let result = load_layers(None, Some(file.path())).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_merge_values_recurses_into_tables() {
        let mut base: toml::Value =
            toml::from_str("[a]\nx = 1\ny = 2\n[b]\nz = 3\n").expect("base");
        let overlay: toml::Value = toml::from_str("[a]\ny = 20\n").expect("overlay");

        merge_values(&mut base, overlay);

        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(20));
        assert_eq!(base["b"]["z"].as_integer(), Some(3));
    }
}
