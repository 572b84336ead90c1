//! crates/reflection_core/src/ports.rs
//!
//! Defines the contract of the remote scoring gateway consumed by the session core.
//! The trait forms the boundary of the hexagonal architecture, so the core stays
//! independent of the concrete transport and wire format.

use async_trait::async_trait;

use crate::domain::{PreviewResponse, ProgressRecord, ReflectionRecord, UserId, VideoId};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The remote side refused the request on validation grounds.
    #[error("{0}")]
    Rejected(String),
    /// Network or server failure; the same request may succeed later.
    #[error("{0}")]
    Transient(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ScoringGateway: Send + Sync {
    // --- Progress ---
    async fn fetch_progress(&self, user_id: UserId, video_id: VideoId) -> PortResult<ProgressRecord>;

    /// Idempotent upsert keyed by `(user_id, video_id)`.
    async fn persist_progress(
        &self,
        user_id: UserId,
        video_id: VideoId,
        completion_percent: u8,
    ) -> PortResult<()>;

    // --- Reflections ---
    async fn preview_quality(&self, text: &str, video_id: VideoId) -> PortResult<PreviewResponse>;

    async fn submit_reflection(&self, text: &str, video_id: VideoId) -> PortResult<ReflectionRecord>;

    /// Existing reflections for a video, newest first.
    async fn list_reflections(&self, video_id: VideoId) -> PortResult<Vec<ReflectionRecord>>;
}
