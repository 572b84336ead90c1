//! crates/reflection_core/src/changes.rs
//!
//! A revision counter bumped whenever background work changes what a session shows.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct ChangeFeed(Arc<watch::Sender<u64>>);

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self(Arc::new(tx))
    }

    pub fn notify(&self) {
        self.0.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.0.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.0.borrow()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
