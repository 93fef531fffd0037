// Configuration loading and parsing (config/pool.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

/// Environment variable that overrides `[database].path`.
pub const DB_PATH_ENV: &str = "PICKPOOL_DB";

const DEFAULT_DB_FILE: &str = "pickpool.db";
const DEFAULT_LOG_FILTER: &str = "pickpool_core=info,pickpool_app=info,warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: String,
    pub log_dir: PathBuf,
    pub log_filter: String,
}

// ---------------------------------------------------------------------------
// pool.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for pool.toml. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PoolFile {
    database: DatabaseSection,
    logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct LoggingSection {
    dir: String,
    filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: "logs".into(),
            filter: DEFAULT_LOG_FILTER.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load `config/pool.toml` relative to `base_dir`, falling back to defaults
/// when the file does not exist. `db_override` (normally the value of
/// [`DB_PATH_ENV`]) replaces the configured database path when non-empty.
pub fn load_config_from(base_dir: &Path, db_override: Option<&str>) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pool.toml");
    let file = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        PoolFile::default()
    };

    let db_path = match db_override.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None if !file.database.path.trim().is_empty() => file.database.path,
        None => default_db_path(),
    };

    let config = Config {
        db_path,
        log_dir: base_dir.join(file.logging.dir),
        log_filter: file.logging.filter,
    };

    validate(&config)?;
    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, honoring the [`DB_PATH_ENV`] override.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: PathBuf::from("."),
        source: e,
    })?;
    let db_override = std::env::var(DB_PATH_ENV).ok();
    load_config_from(&cwd, db_override.as_deref())
}

/// `pickpool.db` in the platform data directory, or the working directory
/// when no home directory can be resolved.
fn default_db_path() -> String {
    directories::ProjectDirs::from("", "", "pickpool")
        .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_DB_FILE.to_string())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.log_filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }
    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
