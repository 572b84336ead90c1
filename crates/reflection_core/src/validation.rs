//! crates/reflection_core/src/validation.rs
//!
//! Local, synchronous checks on a draft reflection. No I/O, deterministic in the text.

use crate::domain::{ValidationIssue, ValidationResult};

pub const MIN_LEN: usize = 50;
pub const MAX_LEN: usize = 2000;
/// Below this length a structurally valid draft still gets a soft warning.
pub const DETAILED_LEN: usize = 100;

/// Enforces the maximum draft length at the input boundary.
pub fn clamp_draft(text: String) -> String {
    match text.char_indices().nth(MAX_LEN) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}

/// Length of a draft as the author perceives it, in characters.
pub fn draft_length(text: &str) -> usize {
    text.chars().count()
}

pub fn validate(text: &str) -> ValidationResult {
    let length = draft_length(text);
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if length < MIN_LEN {
        errors.push(ValidationIssue::TooShort { min: MIN_LEN });
    }
    if length > MAX_LEN {
        errors.push(ValidationIssue::TooLong { max: MAX_LEN });
    }

    if (MIN_LEN..DETAILED_LEN).contains(&length) {
        warnings.push(ValidationIssue::ExpandFurther { suggested: DETAILED_LEN });
    }
    if length >= DETAILED_LEN && !text.contains(|c: char| c == '?' || c == '？') {
        warnings.push(ValidationIssue::ConsiderQuestion);
    }

    ValidationResult { is_structurally_valid: errors.is_empty(), errors, warnings, length }
}
