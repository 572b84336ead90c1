//! services/host/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the video page and the session host.
//! Every server message is a complete statement; the client never has to merge deltas.

use chrono::{DateTime, Utc};
use reflection_core::{
    PreviewVerdict, ReflectionRecord, SessionSnapshot, SubmissionState, SubmitError,
    ValidationIssue, ValidationResult,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the session for a `(user, video)` pair. Must be the first message.
    Init { user_id: i64, video_id: i64 },

    /// Raw position report from the player, sent on every time update.
    PlaybackTick { position: f64, duration: f64 },

    PlaybackStarted,
    PlaybackPaused,

    /// The player reached its natural end.
    PlaybackEnded,

    /// The full draft text after an edit.
    DraftChanged { text: String },

    Submit,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms successful session initialization.
    SessionInitialized { session_id: Uuid },

    /// The full presentation state of the session.
    Snapshot(SnapshotView),

    SubmissionFailed { kind: String, message: String },

    SubmissionConfirmed { reflection_id: i64 },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}

impl From<&SubmitError> for ServerMessage {
    fn from(error: &SubmitError) -> Self {
        Self::SubmissionFailed { kind: error.kind().to_string(), message: error.to_string() }
    }
}

//=========================================================================================
// Snapshot Views
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
pub struct SnapshotView {
    pub session_id: Uuid,
    pub video_id: i64,
    pub completion_percent: u8,
    pub is_completed: bool,
    pub can_write_reflection: bool,
    pub resume_position_secs: Option<f64>,
    pub draft_text: String,
    pub validation: ValidationView,
    pub preview: Option<PreviewView>,
    pub submission: SubmissionView,
    pub reflections: Vec<ReflectionView>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ValidationView {
    pub is_valid: bool,
    pub length: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PreviewView {
    /// False while the shown verdict belongs to an older draft.
    pub is_current: bool,
    pub quality_score: Option<u8>,
    pub predicted_approval: bool,
    pub error: Option<String>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionView {
    Idle,
    Submitting,
    Confirmed { reflection_id: i64 },
    Failed { message: String },
}

#[derive(Serialize, Debug, Clone)]
pub struct ReflectionView {
    pub id: i64,
    pub content: String,
    pub word_count: usize,
    pub quality_score: f64,
    pub is_approved: bool,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SessionSnapshot> for SnapshotView {
    fn from(snapshot: SessionSnapshot) -> Self {
        let is_current = snapshot.verdict_is_current;
        Self {
            session_id: snapshot.session_id,
            video_id: snapshot.video_id,
            completion_percent: snapshot.completion_percent,
            is_completed: snapshot.is_completed,
            can_write_reflection: snapshot.can_write_reflection,
            resume_position_secs: snapshot.resume_position_secs,
            draft_text: snapshot.draft_text,
            validation: snapshot.validation.into(),
            preview: snapshot.preview_verdict.map(|verdict| PreviewView::new(verdict, is_current)),
            submission: snapshot.submission_state.into(),
            reflections: snapshot.reflections.into_iter().map(Into::into).collect(),
        }
    }
}

fn messages(issues: &[ValidationIssue]) -> Vec<String> {
    issues.iter().map(ToString::to_string).collect()
}

impl From<ValidationResult> for ValidationView {
    fn from(result: ValidationResult) -> Self {
        Self {
            is_valid: result.is_structurally_valid,
            length: result.length,
            errors: messages(&result.errors),
            warnings: messages(&result.warnings),
        }
    }
}

impl PreviewView {
    fn new(verdict: PreviewVerdict, is_current: bool) -> Self {
        Self {
            is_current,
            quality_score: verdict.quality_score,
            predicted_approval: verdict.predicted_approval,
            error: verdict.remote_error,
            feedback: verdict.feedback,
            suggestions: verdict.suggestions,
        }
    }
}

impl From<SubmissionState> for SubmissionView {
    fn from(state: SubmissionState) -> Self {
        match state {
            SubmissionState::Idle => Self::Idle,
            SubmissionState::Submitting => Self::Submitting,
            SubmissionState::Confirmed { reflection_id } => Self::Confirmed { reflection_id },
            SubmissionState::Failed { message } => Self::Failed { message },
        }
    }
}

impl From<ReflectionRecord> for ReflectionView {
    fn from(record: ReflectionRecord) -> Self {
        Self {
            id: record.id,
            content: record.content,
            word_count: record.word_count,
            quality_score: record.quality_score,
            is_approved: record.is_approved,
            feedback: record.feedback,
            created_at: record.created_at,
        }
    }
}
