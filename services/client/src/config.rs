//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub db_path: PathBuf,
    pub log_level: Level,
    pub progress_tick: Duration,
    pub typing_delay: Duration,
    pub notice_ttl: Duration,
    pub history_window: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Backend & Storage ---
        let api_url = std::env::var("DOCCHAT_API_URL")
            .ok()
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "DOCCHAT_API_URL".to_string(),
                format!("'{}' must start with http:// or https://", api_url),
            ));
        }

        let db_path = std::env::var("DOCCHAT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./docchat.db"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- UI Timings ---
        let progress_tick = Duration::from_millis(env_number("DOCCHAT_PROGRESS_TICK_MS", 200)?);
        let typing_delay = Duration::from_millis(env_number("DOCCHAT_TYPING_DELAY_MS", 600)?);
        let notice_ttl = Duration::from_millis(env_number("DOCCHAT_NOTICE_TTL_MS", 4000)?);
        let history_window = env_number("DOCCHAT_HISTORY_WINDOW", 10)? as usize;

        Ok(Self {
            api_url,
            db_path,
            log_level,
            progress_tick,
            typing_delay,
            notice_ttl,
            history_window,
        })
    }
}

fn env_number(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a number", raw))
        }),
        Err(_) => Ok(default),
    }
}
