//! crates/reflection_core/src/session.rs
//!
//! One viewing-and-reflection session for a `(user, video)` pair. The session is
//! constructed explicitly and owns its tracker, preview pipeline and submission
//! coordinator; nothing here is process-global.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::changes::ChangeFeed;
use crate::domain::{
    PreviewVerdict, ReflectionRecord, SubmissionOutcome, SubmissionState, UserId,
    ValidationResult, VideoId,
};
use crate::ports::{PortResult, ScoringGateway};
use crate::preview::{
    PreviewPipeline, DEFAULT_PREVIEW_DEBOUNCE, MAX_PREVIEW_DEBOUNCE_MS, MIN_PREVIEW_DEBOUNCE_MS,
};
use crate::progress::{ProgressTracker, AUTOSAVE_INTERVAL};
use crate::submission::{SubmissionCoordinator, SubmitError};

/// Timing knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub autosave_interval: Duration,
    pub preview_debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { autosave_interval: AUTOSAVE_INTERVAL, preview_debounce: DEFAULT_PREVIEW_DEBOUNCE }
    }
}

impl SessionConfig {
    /// Sets the preview debounce, clamped to [500, 1000] ms.
    pub fn with_preview_debounce_millis(mut self, ms: u64) -> Self {
        let clamped = ms.clamp(MIN_PREVIEW_DEBOUNCE_MS, MAX_PREVIEW_DEBOUNCE_MS);
        self.preview_debounce = Duration::from_millis(clamped);
        self
    }

    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }
}

/// The read-only projection handed to presentation collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub video_id: VideoId,
    pub completion_percent: u8,
    pub is_completed: bool,
    pub can_write_reflection: bool,
    pub resume_position_secs: Option<f64>,
    pub draft_text: String,
    pub validation: ValidationResult,
    pub preview_verdict: Option<PreviewVerdict>,
    pub verdict_is_current: bool,
    pub submission_state: SubmissionState,
    pub reflections: Vec<ReflectionRecord>,
}

pub struct ReflectionSession {
    id: Uuid,
    user_id: UserId,
    video_id: VideoId,
    progress: ProgressTracker,
    preview: PreviewPipeline,
    submission: SubmissionCoordinator,
    changes: ChangeFeed,
}

impl ReflectionSession {
    /// Loads stored progress and existing reflections, then builds the session.
    /// Failing to load progress fails the session; failing to load reflections
    /// only leaves the collection empty.
    pub async fn open(
        gateway: Arc<dyn ScoringGateway>,
        user_id: UserId,
        video_id: VideoId,
        config: SessionConfig,
    ) -> PortResult<Self> {
        let changes = ChangeFeed::new();
        let progress = ProgressTracker::load(
            gateway.clone(),
            user_id,
            video_id,
            config.autosave_interval,
            changes.clone(),
        )
        .await?;

        let reflections = match gateway.list_reflections(video_id).await {
            Ok(reflections) => reflections,
            Err(e) => {
                warn!(video_id, error = %e, "could not load existing reflections");
                Vec::new()
            }
        };

        let preview =
            PreviewPipeline::new(gateway.clone(), video_id, config.preview_debounce, changes.clone());
        let submission = SubmissionCoordinator::new(gateway, reflections, changes.clone());

        let id = Uuid::new_v4();
        info!(session = %id, user_id, video_id, "reflection session opened");
        Ok(Self { id, user_id, video_id, progress, preview, submission, changes })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    //-------------------------------------------------------------------------------------
    // Action entry points
    //-------------------------------------------------------------------------------------

    pub async fn update_position(&self, position_secs: f64, duration_secs: f64) {
        self.progress.update_position(position_secs, duration_secs).await;
    }

    pub async fn playback_started(&self) {
        self.progress.set_playing(true).await;
    }

    pub async fn playback_paused(&self) {
        self.progress.set_playing(false).await;
    }

    pub async fn playback_ended(&self) {
        self.progress.mark_completed().await;
    }

    pub async fn on_draft_change(&self, text: String) -> ValidationResult {
        self.submission.reset().await;
        self.preview.on_draft_change(text).await
    }

    /// Submits the current draft. On success the draft and verdict are cleared
    /// unless the author kept typing meanwhile; on failure the draft is untouched.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmitError> {
        let draft = self.preview.draft().await;
        let record = self.progress.record().await;
        let outcome = self.submission.submit(&draft, &record).await?;
        self.preview.clear_if_unchanged(&draft.text).await;
        self.changes.notify();
        Ok(outcome)
    }

    //-------------------------------------------------------------------------------------
    // Read side
    //-------------------------------------------------------------------------------------

    pub async fn can_write_reflection(&self) -> bool {
        self.progress.can_write_reflection().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let record = self.progress.record().await;
        let preview = self.preview.snapshot().await;
        SessionSnapshot {
            session_id: self.id,
            video_id: self.video_id,
            completion_percent: record.completion_percent,
            is_completed: record.is_completed,
            can_write_reflection: record.can_write_reflection(),
            resume_position_secs: record.last_watched_position_secs,
            verdict_is_current: preview.verdict_is_current(),
            draft_text: preview.draft_text,
            validation: preview.validation,
            preview_verdict: preview.verdict,
            submission_state: self.submission.state().await,
            reflections: self.submission.reflections().await,
        }
    }

    /// Notified whenever background work changes the snapshot.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Tears the session down. No timer armed by it fires afterwards.
    pub fn close(&self) {
        self.progress.close();
        self.preview.close();
        info!(session = %self.id, video_id = self.video_id, "reflection session closed");
    }
}
