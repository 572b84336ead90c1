//! crates/reflection_core/src/submission.rs
//!
//! The submission state machine: `Idle -> Submitting -> {Confirmed, Failed}`.
//! Preconditions are checked locally before any network call, and at most one
//! submission is in flight at a time.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::changes::ChangeFeed;
use crate::domain::{
    DraftReflection, ProgressRecord, ReflectionRecord, SubmissionOutcome, SubmissionState,
    ValidationIssue, REQUIRED_WATCH_PERCENT,
};
use crate::ports::{PortError, ScoringGateway};
use crate::validation::validate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Watch at least {required}% of the video before writing a reflection (watched {completion_percent}%)")]
    NotEligible { completion_percent: u8, required: u8 },

    #[error("Reflection content is invalid: {}", describe(.0))]
    ContentInvalid(Vec<ValidationIssue>),

    #[error("A submission is already in progress")]
    AlreadyInProgress,

    /// The remote side refused the reflection. The message is shown as received.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transient(String),
}

impl SubmitError {
    /// Stable identifier for clients that branch on the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotEligible { .. } => "not_eligible",
            Self::ContentInvalid(_) => "content_invalid",
            Self::AlreadyInProgress => "already_in_progress",
            Self::Rejected(_) => "rejected",
            Self::Transient(_) => "transient",
        }
    }
}

impl From<PortError> for SubmitError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::Transient(message) => Self::Transient(message),
            PortError::Rejected(message) | PortError::NotFound(message) => Self::Rejected(message),
            PortError::Unauthorized => Self::Rejected(PortError::Unauthorized.to_string()),
        }
    }
}

fn describe(issues: &[ValidationIssue]) -> String {
    issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

struct CoordinatorState {
    state: SubmissionState,
    /// Newest first.
    reflections: Vec<ReflectionRecord>,
}

pub struct SubmissionCoordinator {
    gateway: Arc<dyn ScoringGateway>,
    inner: Mutex<CoordinatorState>,
    changes: ChangeFeed,
}

impl SubmissionCoordinator {
    pub fn new(
        gateway: Arc<dyn ScoringGateway>,
        reflections: Vec<ReflectionRecord>,
        changes: ChangeFeed,
    ) -> Self {
        Self {
            gateway,
            inner: Mutex::new(CoordinatorState { state: SubmissionState::Idle, reflections }),
            changes,
        }
    }

    /// Submits `draft` if the gate in `progress` is open and the text is valid.
    pub async fn submit(
        &self,
        draft: &DraftReflection,
        progress: &ProgressRecord,
    ) -> Result<SubmissionOutcome, SubmitError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.state.is_in_flight() {
                return Err(SubmitError::AlreadyInProgress);
            }
            if !progress.can_write_reflection() {
                return Err(SubmitError::NotEligible {
                    completion_percent: progress.completion_percent,
                    required: REQUIRED_WATCH_PERCENT,
                });
            }
            let validation = validate(&draft.text);
            if !validation.is_structurally_valid {
                return Err(SubmitError::ContentInvalid(validation.errors));
            }
            inner.state = SubmissionState::Submitting;
        }
        self.changes.notify();
        info!(video_id = draft.video_id, "submitting reflection");

        let result = self.gateway.submit_reflection(&draft.text, draft.video_id).await;

        let outcome = {
            let mut inner = self.inner.lock().await;
            match result {
                Ok(record) => {
                    let reflection_id = record.id;
                    inner.reflections.insert(0, record);
                    inner.state = SubmissionState::Confirmed { reflection_id };
                    info!(video_id = draft.video_id, reflection_id, "reflection confirmed");
                    Ok(SubmissionOutcome {
                        committed_locally: true,
                        remote_confirmed: true,
                        server_assigned_id: Some(reflection_id),
                    })
                }
                Err(e) => {
                    let error = SubmitError::from(e);
                    warn!(video_id = draft.video_id, error = %error, "reflection submission failed");
                    inner.state = SubmissionState::Failed { message: error.to_string() };
                    Err(error)
                }
            }
        };
        self.changes.notify();
        outcome
    }

    pub async fn state(&self) -> SubmissionState {
        self.inner.lock().await.state.clone()
    }

    pub async fn reflections(&self) -> Vec<ReflectionRecord> {
        self.inner.lock().await.reflections.clone()
    }

    /// Leaves `Confirmed` or `Failed` once the author starts a new draft.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_in_flight() {
            inner.state = SubmissionState::Idle;
        }
    }
}
