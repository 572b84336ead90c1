//! crates/reflection_core/src/progress.rs
//!
//! Turns raw playback ticks into a periodically persisted completion percentage
//! and exposes the "may write reflection" gate derived from it.
//!
//! Persistence triggers:
//! - autosave, at most once per interval while playing (throttled),
//! - a 10-point milestone above the last known value (immediate),
//! - completion at 100% or end of media (immediate).
//!
//! All persists run one at a time. Each computes its target when it starts and
//! is skipped unless the target exceeds what the remote side acknowledged, so
//! the persisted value never decreases and coinciding triggers coalesce.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::changes::ChangeFeed;
use crate::domain::{PlaybackState, ProgressRecord, UserId, VideoId};
use crate::ports::{PortResult, ScoringGateway};
use crate::timing::Throttle;

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);
pub const MILESTONE_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistReason {
    Autosave,
    Milestone,
    Completion,
}

struct TrackerState {
    playback: PlaybackState,
    is_playing: bool,
    /// Last known value, including optimistic bumps not yet acknowledged.
    record: ProgressRecord,
    acknowledged_percent: u8,
}

struct TrackerShared {
    user_id: UserId,
    video_id: VideoId,
    gateway: Arc<dyn ScoringGateway>,
    state: Mutex<TrackerState>,
    /// Serializes persists so they reach the gateway in increasing order.
    persist_lock: Mutex<()>,
    changes: ChangeFeed,
}

pub struct ProgressTracker {
    shared: Arc<TrackerShared>,
    throttle: Throttle,
    teardown: CancellationToken,
}

impl ProgressTracker {
    /// Fetches the stored progress for `(user_id, video_id)`. A video the user
    /// never watched comes back from the gateway as a fresh 0% record; an
    /// unknown video is a `NotFound` error and fails the load.
    pub async fn load(
        gateway: Arc<dyn ScoringGateway>,
        user_id: UserId,
        video_id: VideoId,
        autosave_interval: Duration,
        changes: ChangeFeed,
    ) -> PortResult<Self> {
        let record = gateway.fetch_progress(user_id, video_id).await?;
        info!(
            user_id,
            video_id,
            percent = record.completion_percent,
            "progress loaded"
        );
        Ok(Self::new(gateway, record, autosave_interval, changes))
    }

    pub fn new(
        gateway: Arc<dyn ScoringGateway>,
        record: ProgressRecord,
        autosave_interval: Duration,
        changes: ChangeFeed,
    ) -> Self {
        let state = TrackerState {
            playback: PlaybackState::default(),
            is_playing: false,
            acknowledged_percent: record.completion_percent,
            record,
        };
        let shared = TrackerShared {
            user_id: state.record.user_id,
            video_id: state.record.video_id,
            gateway,
            state: Mutex::new(state),
            persist_lock: Mutex::new(()),
            changes,
        };
        Self {
            shared: Arc::new(shared),
            throttle: Throttle::new(autosave_interval),
            teardown: CancellationToken::new(),
        }
    }

    /// Records a playback tick. Only updates in-memory state; any resulting
    /// persist runs in the background.
    pub async fn update_position(&self, position_secs: f64, duration_secs: f64) {
        let trigger = {
            let mut state = self.shared.state.lock().await;
            state.playback = PlaybackState {
                current_position_secs: position_secs,
                total_duration_secs: duration_secs,
            };
            let percent = state.playback.completion_percent();
            let trigger = persist_trigger(&state, percent);
            if matches!(trigger, Some(PersistReason::Milestone | PersistReason::Completion)) {
                // Optimistic: later ticks must not re-detect the same milestone.
                raise_record(&mut state.record, percent);
            }
            trigger
        };

        match trigger {
            Some(reason @ (PersistReason::Milestone | PersistReason::Completion)) => {
                self.shared.changes.notify();
                self.persist_now(reason);
            }
            Some(PersistReason::Autosave) => {
                self.throttle
                    .trigger(persist(self.shared.clone(), PersistReason::Autosave))
                    .await;
            }
            None => {}
        }
    }

    pub async fn set_playing(&self, playing: bool) {
        self.shared.state.lock().await.is_playing = playing;
        if !playing {
            self.throttle.cancel().await;
        }
    }

    /// Natural end of media: the video counts as fully watched.
    pub async fn mark_completed(&self) {
        {
            let mut state = self.shared.state.lock().await;
            state.is_playing = false;
            if state.playback.total_duration_secs > 0.0 {
                state.playback.current_position_secs = state.playback.total_duration_secs;
            }
            raise_record(&mut state.record, 100);
        }
        self.shared.changes.notify();
        self.throttle.cancel().await;
        self.persist_now(PersistReason::Completion);
    }

    /// Snapshot of the last known record.
    pub async fn record(&self) -> ProgressRecord {
        self.shared.state.lock().await.record.clone()
    }

    pub async fn playback(&self) -> PlaybackState {
        self.shared.state.lock().await.playback
    }

    pub async fn is_playing(&self) -> bool {
        self.shared.state.lock().await.is_playing
    }

    /// Recomputed from the latest record on every call.
    pub async fn can_write_reflection(&self) -> bool {
        self.shared.state.lock().await.record.can_write_reflection()
    }

    /// Stops all timers. Persists already talking to the gateway finish on their own.
    pub fn close(&self) {
        self.throttle.shutdown();
        self.teardown.cancel();
    }

    fn persist_now(&self, reason: PersistReason) {
        let shared = self.shared.clone();
        let teardown = self.teardown.clone();
        tokio::spawn(async move {
            if teardown.is_cancelled() {
                return;
            }
            persist(shared, reason).await;
        });
    }
}

impl Drop for ProgressTracker {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

fn persist_trigger(state: &TrackerState, percent: u8) -> Option<PersistReason> {
    let known = state.record.completion_percent;
    if percent >= 100 && !state.record.is_completed {
        Some(PersistReason::Completion)
    } else if percent > known && percent / MILESTONE_STEP > known / MILESTONE_STEP {
        Some(PersistReason::Milestone)
    } else if state.is_playing {
        Some(PersistReason::Autosave)
    } else {
        None
    }
}

fn raise_record(record: &mut ProgressRecord, percent: u8) {
    if percent > record.completion_percent {
        record.completion_percent = percent.min(100);
    }
    record.is_completed = record.completion_percent >= 100;
}

async fn persist(shared: Arc<TrackerShared>, reason: PersistReason) {
    let _serial = shared.persist_lock.lock().await;

    let target = {
        let mut state = shared.state.lock().await;
        let current = state.playback.completion_percent();
        raise_record(&mut state.record, current);
        let target = state.record.completion_percent;
        if target <= state.acknowledged_percent {
            debug!(
                video_id = shared.video_id,
                target,
                ?reason,
                "progress already persisted, skipping"
            );
            return;
        }
        target
    };
    debug!(video_id = shared.video_id, percent = target, ?reason, "persisting progress");

    match shared
        .gateway
        .persist_progress(shared.user_id, shared.video_id, target)
        .await
    {
        Ok(()) => {
            {
                let mut state = shared.state.lock().await;
                state.acknowledged_percent = state.acknowledged_percent.max(target);
                state.record.last_persisted_at = Some(Utc::now());
            }
            info!(video_id = shared.video_id, percent = target, ?reason, "progress persisted");
            shared.changes.notify();
        }
        Err(e) => {
            // The local record keeps the value; the next autosave retries it.
            warn!(
                video_id = shared.video_id,
                percent = target,
                ?reason,
                error = %e,
                "progress persist failed"
            );
        }
    }
}
