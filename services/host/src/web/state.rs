//! services/host/src/web/state.rs
//!
//! Defines the state shared by every connection.

use crate::config::Config;
use reflection_core::ports::ScoringGateway;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// Per-connection state lives in the `ReflectionSession` each socket opens.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ScoringGateway>,
    pub config: Arc<Config>,
}
