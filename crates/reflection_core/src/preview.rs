//! crates/reflection_core/src/preview.rs
//!
//! Owns the draft reflection. Every change is validated locally and, when the
//! draft is structurally valid, a remote quality preview is requested once typing
//! pauses. Each request is numbered when it goes out. A response is applied only
//! while it belongs to the newest request and its text is still the current
//! draft, so a slow older answer never replaces a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::changes::ChangeFeed;
use crate::domain::{DraftReflection, PreviewVerdict, ValidationResult, VideoId};
use crate::ports::ScoringGateway;
use crate::timing::Debouncer;
use crate::validation::{clamp_draft, validate};

pub const DEFAULT_PREVIEW_DEBOUNCE: Duration = Duration::from_millis(500);
pub const MIN_PREVIEW_DEBOUNCE_MS: u64 = 500;
pub const MAX_PREVIEW_DEBOUNCE_MS: u64 = 1000;

/// Read-only view of the authoring state.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSnapshot {
    pub draft_text: String,
    pub validation: ValidationResult,
    pub verdict: Option<PreviewVerdict>,
}

impl PreviewSnapshot {
    /// Whether the displayed verdict was computed for the current draft.
    pub fn verdict_is_current(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| v.requested_for_text == self.draft_text)
    }
}

struct PreviewState {
    draft: DraftReflection,
    validation: ValidationResult,
    verdict: Option<PreviewVerdict>,
}

struct PreviewShared {
    video_id: VideoId,
    gateway: Arc<dyn ScoringGateway>,
    state: Mutex<PreviewState>,
    /// Number of the most recently issued remote request.
    latest_request: AtomicU64,
    teardown: CancellationToken,
    changes: ChangeFeed,
}

pub struct PreviewPipeline {
    shared: Arc<PreviewShared>,
    debouncer: Debouncer,
}

impl PreviewPipeline {
    pub fn new(
        gateway: Arc<dyn ScoringGateway>,
        video_id: VideoId,
        debounce: Duration,
        changes: ChangeFeed,
    ) -> Self {
        let state = PreviewState {
            draft: DraftReflection { text: String::new(), video_id },
            validation: validate(""),
            verdict: None,
        };
        Self {
            shared: Arc::new(PreviewShared {
                video_id,
                gateway,
                state: Mutex::new(state),
                latest_request: AtomicU64::new(0),
                teardown: CancellationToken::new(),
                changes,
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Applies a keystroke. Returns the local validation of the new draft.
    pub async fn on_draft_change(&self, text: String) -> ValidationResult {
        let text = clamp_draft(text);
        let validation = validate(&text);
        {
            let mut state = self.shared.state.lock().await;
            state.draft.text = text.clone();
            state.validation = validation.clone();
            if !validation.is_structurally_valid {
                state.verdict = None;
            }
        }

        if validation.is_structurally_valid {
            self.debouncer.trigger(request_preview(self.shared.clone(), text)).await;
        } else {
            self.debouncer.cancel().await;
        }
        validation
    }

    pub async fn draft(&self) -> DraftReflection {
        self.shared.state.lock().await.draft.clone()
    }

    pub async fn validation(&self) -> ValidationResult {
        self.shared.state.lock().await.validation.clone()
    }

    pub async fn verdict(&self) -> Option<PreviewVerdict> {
        self.shared.state.lock().await.verdict.clone()
    }

    pub async fn snapshot(&self) -> PreviewSnapshot {
        let state = self.shared.state.lock().await;
        PreviewSnapshot {
            draft_text: state.draft.text.clone(),
            validation: state.validation.clone(),
            verdict: state.verdict.clone(),
        }
    }

    /// Empties the draft and verdict, but only if the draft is still `submitted`.
    /// Text typed after a submission started is kept.
    pub async fn clear_if_unchanged(&self, submitted: &str) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.draft.text != submitted {
            return false;
        }
        state.draft.text.clear();
        state.validation = validate("");
        state.verdict = None;
        drop(state);
        self.debouncer.cancel().await;
        true
    }

    /// Stops the debouncer and ignores any response still in flight.
    pub fn close(&self) {
        self.debouncer.shutdown();
        self.shared.teardown.cancel();
    }
}

async fn request_preview(shared: Arc<PreviewShared>, text: String) {
    if shared.teardown.is_cancelled() {
        return;
    }
    let request = shared.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(
        video_id = shared.video_id,
        request,
        length = text.chars().count(),
        "requesting quality preview"
    );
    let result = shared.gateway.preview_quality(&text, shared.video_id).await;

    let mut state = shared.state.lock().await;
    let superseded = shared.latest_request.load(Ordering::SeqCst) != request;
    if shared.teardown.is_cancelled() || superseded || state.draft.text != text {
        debug!(video_id = shared.video_id, request, superseded, "discarding stale preview response");
        return;
    }
    state.verdict = Some(match result {
        Ok(response) => PreviewVerdict::from_response(text, response),
        Err(e) => {
            warn!(video_id = shared.video_id, error = %e, "quality preview failed");
            PreviewVerdict::from_error(text, e.to_string())
        }
    });
    drop(state);
    shared.changes.notify();
}
