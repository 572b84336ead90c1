//! crates/reflection_core/src/test_support.rs
//!
//! Scripted in-memory gateway shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::{PreviewResponse, ProgressRecord, ReflectionRecord, UserId, VideoId};
use crate::ports::{PortError, PortResult, ScoringGateway};

/// Records every call and answers from scripted queues. Unscripted calls succeed,
/// and a video without scripted progress reads as never watched.
#[derive(Default)]
pub struct MockGateway {
    fetched_percent: Mutex<Option<u8>>,
    unknown_video: AtomicBool,
    persisted: Mutex<Vec<u8>>,
    persist_failures: Mutex<VecDeque<PortError>>,
    previews: Mutex<Vec<String>>,
    preview_latencies: Mutex<VecDeque<Duration>>,
    preview_failures: Mutex<VecDeque<PortError>>,
    submissions: Mutex<Vec<String>>,
    submit_latency: Mutex<Duration>,
    submit_failures: Mutex<VecDeque<PortError>>,
    existing: Mutex<Vec<ReflectionRecord>>,
    next_id: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { next_id: AtomicUsize::new(100), ..Default::default() })
    }

    pub fn with_progress(percent: u8) -> Arc<Self> {
        Arc::new(Self {
            fetched_percent: Mutex::new(Some(percent)),
            next_id: AtomicUsize::new(100),
            ..Default::default()
        })
    }

    /// A gateway whose video does not exist: progress fetches answer `NotFound`.
    pub fn unknown_video() -> Arc<Self> {
        Arc::new(Self {
            unknown_video: AtomicBool::new(true),
            next_id: AtomicUsize::new(100),
            ..Default::default()
        })
    }

    pub async fn fail_next_persist(&self, error: PortError) {
        self.persist_failures.lock().await.push_back(error);
    }

    pub async fn delay_next_preview(&self, latency: Duration) {
        self.preview_latencies.lock().await.push_back(latency);
    }

    pub async fn fail_next_preview(&self, error: PortError) {
        self.preview_failures.lock().await.push_back(error);
    }

    pub async fn set_submit_latency(&self, latency: Duration) {
        *self.submit_latency.lock().await = latency;
    }

    pub async fn fail_next_submit(&self, error: PortError) {
        self.submit_failures.lock().await.push_back(error);
    }

    pub async fn add_existing(&self, record: ReflectionRecord) {
        self.existing.lock().await.push(record);
    }

    pub async fn persisted(&self) -> Vec<u8> {
        self.persisted.lock().await.clone()
    }

    pub async fn previews(&self) -> Vec<String> {
        self.previews.lock().await.clone()
    }

    pub async fn submissions(&self) -> Vec<String> {
        self.submissions.lock().await.clone()
    }
}

pub fn reflection(id: i64, video_id: VideoId, content: &str) -> ReflectionRecord {
    ReflectionRecord {
        id,
        user_id: 1,
        video_id,
        content: content.to_string(),
        word_count: content.chars().count(),
        quality_score: 75.0,
        is_approved: true,
        feedback: None,
        created_at: Utc::now(),
    }
}

/// Score the mock assigns to a previewed text: one point per character, capped.
pub fn mock_score(text: &str) -> u8 {
    text.chars().count().min(100) as u8
}

#[async_trait]
impl ScoringGateway for MockGateway {
    async fn fetch_progress(&self, user_id: UserId, video_id: VideoId) -> PortResult<ProgressRecord> {
        if self.unknown_video.load(Ordering::SeqCst) {
            return Err(PortError::NotFound(format!("video {video_id}")));
        }
        match *self.fetched_percent.lock().await {
            Some(percent) => Ok(ProgressRecord::at(user_id, video_id, percent)),
            None => Ok(ProgressRecord::fresh(user_id, video_id)),
        }
    }

    async fn persist_progress(
        &self,
        _user_id: UserId,
        _video_id: VideoId,
        completion_percent: u8,
    ) -> PortResult<()> {
        if let Some(error) = self.persist_failures.lock().await.pop_front() {
            return Err(error);
        }
        self.persisted.lock().await.push(completion_percent);
        Ok(())
    }

    async fn preview_quality(&self, text: &str, _video_id: VideoId) -> PortResult<PreviewResponse> {
        self.previews.lock().await.push(text.to_string());
        let latency = self.preview_latencies.lock().await.pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.preview_failures.lock().await.pop_front() {
            return Err(error);
        }
        Ok(PreviewResponse {
            valid: true,
            quality_score: Some(mock_score(text)),
            quality_passed: true,
            predicted_approval: true,
            error: None,
            feedback: Some("Well structured.".to_string()),
            suggestions: Vec::new(),
        })
    }

    async fn submit_reflection(&self, text: &str, video_id: VideoId) -> PortResult<ReflectionRecord> {
        self.submissions.lock().await.push(text.to_string());
        let latency = *self.submit_latency.lock().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.submit_failures.lock().await.pop_front() {
            return Err(error);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64;
        Ok(reflection(id, video_id, text))
    }

    async fn list_reflections(&self, _video_id: VideoId) -> PortResult<Vec<ReflectionRecord>> {
        Ok(self.existing.lock().await.clone())
    }
}
