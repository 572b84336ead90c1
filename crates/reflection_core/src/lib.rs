pub mod changes;
pub mod domain;
pub mod ports;
pub mod preview;
pub mod progress;
pub mod session;
pub mod submission;
pub mod timing;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use domain::{
    DraftReflection, PlaybackState, PreviewResponse, PreviewVerdict, ProgressRecord,
    ReflectionRecord, SubmissionOutcome, SubmissionState, ValidationIssue, ValidationResult,
};
pub use ports::{PortError, PortResult, ScoringGateway};
pub use session::{ReflectionSession, SessionConfig, SessionSnapshot};
pub use submission::SubmitError;
