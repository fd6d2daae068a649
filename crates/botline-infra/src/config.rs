//! Configuration loader and data-directory resolution.
//!
//! The host's `config.toml` lives in the data directory (`~/.botline/` by
//! default) next to the SQLite database.

use std::path::{Path, PathBuf};

use botline_types::config::BotlineConfig;
use botline_types::error::ConfigError;
use tracing::debug;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "BOTLINE_DATA_DIR";

pub const CONFIG_FILE_NAME: &str = "config.toml";

const DATABASE_FILE_NAME: &str = "botline.db";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `BOTLINE_DATA_DIR` environment variable
/// 2. `~/.botline`
/// 3. `.botline` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())
}

fn data_dir_from(env_dir: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".botline"),
        None => PathBuf::from(".botline"),
    }
}

/// `sqlite://<data_dir>/botline.db`
pub fn default_database_url() -> String {
    sqlite_url(&resolve_data_dir().join(DATABASE_FILE_NAME))
}

/// The configured database URL, or [`default_database_url`].
pub fn database_url(config: &BotlineConfig) -> String {
    config
        .storage
        .database_url
        .clone()
        .unwrap_or_else(default_database_url)
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Read and parse the config file at `path`.
pub async fn load_config(path: &Path) -> Result<BotlineConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Load `<data_dir>/config.toml`, or the defaults when there is no file.
///
/// A file that exists but cannot be read or parsed is still an error.
pub async fn load_default_config() -> Result<BotlineConfig, ConfigError> {
    load_config_or_default(&resolve_data_dir().join(CONFIG_FILE_NAME)).await
}

async fn load_config_or_default(path: &Path) -> Result<BotlineConfig, ConfigError> {
    match tokio::fs::try_exists(path).await {
        Ok(false) => {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(BotlineConfig::default())
        }
        _ => load_config(path).await,
    }
}
