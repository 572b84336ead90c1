//! crates/reflection_core/src/domain.rs
//!
//! Defines the pure, core data structures for a viewing and reflection session.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};

pub type UserId = i64;
pub type VideoId = i64;
pub type ReflectionId = i64;

/// Share of the video that must be watched before a reflection may be written.
pub const REQUIRED_WATCH_PERCENT: u8 = 50;

/// The capability gate. Always derived from a completion percentage, never stored.
pub fn can_write_reflection(completion_percent: u8) -> bool {
    completion_percent >= REQUIRED_WATCH_PERCENT
}

//=========================================================================================
// Playback and Progress
//=========================================================================================

/// Raw position of the active player. Ephemeral, never persisted as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub current_position_secs: f64,
    pub total_duration_secs: f64,
}

impl PlaybackState {
    /// Floor-rounded share watched, clamped to [0, 100].
    /// An unknown or zero duration counts as 0%.
    pub fn completion_percent(&self) -> u8 {
        let (position, duration) = (self.current_position_secs, self.total_duration_secs);
        if !position.is_finite() || !duration.is_finite() || duration <= 0.0 {
            return 0;
        }
        (position / duration * 100.0).floor().clamp(0.0, 100.0) as u8
    }
}

/// The last progress value acknowledged (or optimistically assumed) by the remote side.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub video_id: VideoId,
    pub completion_percent: u8,
    pub is_completed: bool,
    pub last_watched_position_secs: Option<f64>,
    pub last_persisted_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// A record for a video the user has not started yet.
    pub fn fresh(user_id: UserId, video_id: VideoId) -> Self {
        Self::at(user_id, video_id, 0)
    }

    pub fn at(user_id: UserId, video_id: VideoId, completion_percent: u8) -> Self {
        let completion_percent = completion_percent.min(100);
        Self {
            user_id,
            video_id,
            completion_percent,
            is_completed: completion_percent >= 100,
            last_watched_position_secs: None,
            last_persisted_at: None,
        }
    }

    pub fn can_write_reflection(&self) -> bool {
        can_write_reflection(self.completion_percent)
    }
}

//=========================================================================================
// Drafting and Preview
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftReflection {
    pub text: String,
    pub video_id: VideoId,
}

/// A single finding of the local, synchronous draft check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationIssue {
    TooShort { min: usize },
    TooLong { max: usize },
    ExpandFurther { suggested: usize },
    ConsiderQuestion,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { min } => write!(f, "A reflection needs at least {min} characters"),
            Self::TooLong { max } => write!(f, "A reflection cannot exceed {max} characters"),
            Self::ExpandFurther { suggested } => {
                write!(f, "Consider expanding further, to at least {suggested} characters")
            }
            Self::ConsiderQuestion => write!(f, "Consider posing a question in your reflection"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_structurally_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub length: usize,
}

/// What the scoring service answered for a preview request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewResponse {
    pub valid: bool,
    pub quality_score: Option<u8>,
    pub quality_passed: bool,
    pub predicted_approval: bool,
    pub error: Option<String>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
}

/// A preview result, tagged with the exact text it was computed for.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewVerdict {
    pub requested_for_text: String,
    pub quality_score: Option<u8>,
    pub predicted_approval: bool,
    pub remote_error: Option<String>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
}

impl PreviewVerdict {
    pub fn from_response(text: String, response: PreviewResponse) -> Self {
        // A response the service itself marks invalid carries its reason as the error.
        let remote_error = if response.valid {
            None
        } else {
            Some(
                response
                    .error
                    .unwrap_or_else(|| "The scoring service rejected the preview.".to_string()),
            )
        };
        Self {
            requested_for_text: text,
            quality_score: response.quality_score,
            predicted_approval: response.valid && response.predicted_approval,
            remote_error,
            feedback: response.feedback,
            suggestions: response.suggestions,
        }
    }

    pub fn from_error(text: String, message: String) -> Self {
        Self {
            requested_for_text: text,
            quality_score: None,
            predicted_approval: false,
            remote_error: Some(message),
            feedback: None,
            suggestions: Vec::new(),
        }
    }
}

//=========================================================================================
// Submission
//=========================================================================================

/// A reflection as stored by the remote side.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionRecord {
    pub id: ReflectionId,
    pub user_id: UserId,
    pub video_id: VideoId,
    pub content: String,
    pub word_count: usize,
    pub quality_score: f64,
    pub is_approved: bool,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub committed_locally: bool,
    pub remote_confirmed: bool,
    pub server_assigned_id: Option<ReflectionId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Submitting,
    Confirmed {
        reflection_id: ReflectionId,
    },
    /// The last attempt failed; a new attempt is allowed.
    Failed {
        message: String,
    },
}

impl SubmissionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}
