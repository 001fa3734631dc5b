//! Bot configuration
//!
//! Read from a JSON file whose path comes from the first CLI argument, else
//! `POLLPLAN_CONFIG`, else `config.json`. `TELEGRAM_TOKEN` overrides the
//! token in the file.

use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "POLLPLAN_CONFIG";
pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No telegram token: set telegram_token in the config or TELEGRAM_TOKEN")]
    MissingToken,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram_token: String,
    pub bot_name: String,
    /// IANA zone name such as `Asia/Singapore`
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("events.db")
}

impl AppConfig {
    /// Path to read: explicit argument, then environment, then default
    pub fn resolve_path(arg: Option<String>, env: Option<String>) -> PathBuf {
        arg.or(env)
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
    }

    /// Load from the process arguments and environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::resolve_path(
            std::env::args().nth(1),
            std::env::var(CONFIG_PATH_ENV).ok(),
        );
        Self::from_file(&path, std::env::var(TOKEN_ENV).ok())
    }

    pub fn from_file(path: &Path, token_override: Option<String>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(token) = token_override.filter(|t| !t.trim().is_empty()) {
            config.telegram_token = token;
        }
        if config.telegram_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(config)
    }

    /// Configured zone, falling back to UTC when the name is unknown
    pub fn timezone(&self) -> Tz {
        self.timezone.trim().parse().unwrap_or_else(|e| {
            tracing::warn!(timezone = %self.timezone, error = %e, "Unknown timezone, using UTC");
            Tz::UTC
        })
    }
}
