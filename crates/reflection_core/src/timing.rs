//! crates/reflection_core/src/timing.rs
//!
//! Deferred-action timers shared by the progress and preview pipelines.
//!
//! `Debouncer` waits for a quiet period: every trigger restarts the wait and
//! replaces the pending action. `Throttle` caps frequency: the first trigger
//! arms one invocation `interval` later, and triggers that arrive while it is
//! armed are absorbed. Both are torn down through a `CancellationToken`; once
//! shut down, nothing they armed will start.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// Shared plumbing
//=========================================================================================

/// One scheduled invocation.
struct Armed {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Armed {
    fn is_waiting(&self) -> bool {
        !self.fired.load(Ordering::SeqCst) && !self.token.is_cancelled()
    }
}

/// Spawn a timer that runs `action` after `delay` unless `parent` (or the
/// returned child token) is cancelled first. Once started, the action is
/// not interrupted.
fn arm<F>(parent: &CancellationToken, delay: Duration, action: F) -> Armed
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = parent.child_token();
    let fired = Arc::new(AtomicBool::new(false));

    let task_token = token.clone();
    let task_fired = fired.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = task_token.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                task_fired.store(true, Ordering::SeqCst);
                action.await;
            }
        }
    });

    Armed { token, fired }
}

//=========================================================================================
// Debouncer
//=========================================================================================

/// Fires the most recent action once `delay` has passed without a new trigger.
pub struct Debouncer {
    delay: Duration,
    teardown: CancellationToken,
    armed: Mutex<Option<Armed>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, teardown: CancellationToken::new(), armed: Mutex::new(None) }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending action with `action` and restart the wait.
    /// Returns `false` if the debouncer has been shut down.
    pub async fn trigger<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut armed = self.armed.lock().await;
        if self.teardown.is_cancelled() {
            return false;
        }
        if let Some(previous) = armed.take() {
            previous.token.cancel();
        }
        *armed = Some(arm(&self.teardown, self.delay, action));
        true
    }

    /// Clear the pending action, if any. The debouncer can be triggered again.
    pub async fn cancel(&self) {
        if let Some(previous) = self.armed.lock().await.take() {
            previous.token.cancel();
        }
    }

    pub async fn is_pending(&self) -> bool {
        self.armed.lock().await.as_ref().is_some_and(Armed::is_waiting)
    }

    /// Permanently stop the debouncer.
    pub fn shutdown(&self) {
        self.teardown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.teardown.is_cancelled()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

//=========================================================================================
// Throttle
//=========================================================================================

/// Runs at most one action per `interval` while triggers keep arriving.
pub struct Throttle {
    interval: Duration,
    teardown: CancellationToken,
    armed: Mutex<Option<Armed>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, teardown: CancellationToken::new(), armed: Mutex::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm `action` to run one interval from now, unless an invocation is
    /// already armed, in which case the trigger is absorbed and `action` is
    /// dropped unrun. Returns `true` if this call armed a new invocation.
    pub async fn trigger<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut armed = self.armed.lock().await;
        if self.teardown.is_cancelled() {
            return false;
        }
        if armed.as_ref().is_some_and(Armed::is_waiting) {
            return false;
        }
        *armed = Some(arm(&self.teardown, self.interval, action));
        true
    }

    /// Clear the armed invocation, if any. The throttle can be triggered again.
    pub async fn cancel(&self) {
        if let Some(previous) = self.armed.lock().await.take() {
            previous.token.cancel();
        }
    }

    pub async fn is_armed(&self) -> bool {
        self.armed.lock().await.as_ref().is_some_and(Armed::is_waiting)
    }

    /// Permanently stop the throttle.
    pub fn shutdown(&self) {
        self.teardown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.teardown.is_cancelled()
    }
}

impl Drop for Throttle {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}

//=========================================================================================
// Tests
//=========================================================================================
