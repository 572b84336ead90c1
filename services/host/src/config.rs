//! services/host/src/config.rs
//!
//! Defines the session host's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use reflection_core::SessionConfig;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub scoring_api_url: String,
    pub log_level: Level,
    pub allowed_origin: String,
    pub preview_debounce_ms: u64,
    pub autosave_interval: Duration,
    pub request_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        // --- Server Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "127.0.0.1:4000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let scoring_api_url = var_or("SCORING_API_URL", "http://127.0.0.1:8000");
        if !scoring_api_url.starts_with("http://") && !scoring_api_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "SCORING_API_URL".to_string(),
                format!("'{}' is not an http(s) URL", scoring_api_url),
            ));
        }
        let scoring_api_url = scoring_api_url.trim_end_matches('/').to_string();

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = var_or("ALLOWED_ORIGIN", "http://localhost:3000");

        // --- Session Timing ---
        let preview_debounce_ms = parse_number(&var_or("PREVIEW_DEBOUNCE_MS", "500"), "PREVIEW_DEBOUNCE_MS")?;
        let autosave_secs = parse_positive(&var_or("AUTOSAVE_INTERVAL_SECS", "30"), "AUTOSAVE_INTERVAL_SECS")?;
        let timeout_secs = parse_positive(&var_or("REQUEST_TIMEOUT_SECS", "10"), "REQUEST_TIMEOUT_SECS")?;

        Ok(Self {
            bind_address,
            scoring_api_url,
            log_level,
            allowed_origin,
            preview_debounce_ms,
            autosave_interval: Duration::from_secs(autosave_secs),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Timing settings handed to every reflection session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::default()
            .with_autosave_interval(self.autosave_interval)
            .with_preview_debounce_millis(self.preview_debounce_ms)
    }
}

fn parse_number(value: &str, name: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn parse_positive(value: &str, name: &str) -> Result<u64, ConfigError> {
    match parse_number(value, name)? {
        0 => Err(ConfigError::InvalidValue(name.to_string(), "must be greater than zero".to_string())),
        n => Ok(n),
    }
}
