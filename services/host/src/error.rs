//! services/host/src/error.rs
//!
//! Defines the primary error type for the session host.

use crate::config::ConfigError;
use reflection_core::ports::PortError;

/// The primary error type for the `host` service.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the scoring gateway port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Building the HTTP client for the scoring service failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rendering a JSON document (such as the OpenAPI description) failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
