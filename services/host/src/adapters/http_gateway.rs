//! services/host/src/adapters/http_gateway.rs
//!
//! This module contains the adapter for the remote scoring service.
//! It implements the `ScoringGateway` port from the `core` crate over the service's
//! JSON REST API, using `reqwest`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reflection_core::{
    domain::{PreviewResponse, ProgressRecord, ReflectionRecord, UserId, VideoId},
    ports::{PortError, PortResult, ScoringGateway},
};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ScoringGateway` against the scoring service's REST API.
#[derive(Clone)]
pub struct HttpScoringGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScoringGateway {
    /// Creates a new `HttpScoringGateway`. `base_url` must not end with a slash.
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> PortResult<T> {
        let response = ensure_success(request.send().await.map_err(transport_error)?).await?;
        response.json::<T>().await.map_err(|e| PortError::Transient(format!("Malformed response: {e}")))
    }
}

//=========================================================================================
// `ScoringGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl ScoringGateway for HttpScoringGateway {
    async fn fetch_progress(&self, user_id: UserId, video_id: VideoId) -> PortResult<ProgressRecord> {
        let request = self
            .client
            .get(self.url(&format!("/api/videos/{video_id}/progress")))
            .query(&[("user_id", user_id)]);
        let body: VideoProgressBody = self.send_json(request).await?;

        // A video the user never opened comes back without a progress entry.
        Ok(match body.progress {
            Some(progress) => progress.into_domain(user_id, video_id),
            None => ProgressRecord::fresh(user_id, video_id),
        })
    }

    async fn persist_progress(
        &self,
        user_id: UserId,
        video_id: VideoId,
        completion_percent: u8,
    ) -> PortResult<()> {
        let body = ProgressUpdateBody {
            user_id,
            completion_percentage: completion_percent,
            is_completed: completion_percent >= 100,
        };
        let response = self
            .client
            .post(self.url(&format!("/api/videos/{video_id}/progress")))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(response).await?;
        debug!(user_id, video_id, completion_percent, "progress persisted");
        Ok(())
    }

    async fn preview_quality(&self, text: &str, video_id: VideoId) -> PortResult<PreviewResponse> {
        let request = self
            .client
            .post(self.url("/api/reflections/preview"))
            .json(&ReflectionBody { content: text, video_id });
        let body: PreviewBody = self.send_json(request).await?;
        Ok(body.into_domain())
    }

    async fn submit_reflection(&self, text: &str, video_id: VideoId) -> PortResult<ReflectionRecord> {
        let request = self
            .client
            .post(self.url("/api/reflections/"))
            .json(&ReflectionBody { content: text, video_id });
        let body: SubmitBody = self.send_json(request).await?;
        let (SubmitBody::Wrapped { reflection } | SubmitBody::Bare(reflection)) = body;
        Ok(reflection.into_domain())
    }

    async fn list_reflections(&self, video_id: VideoId) -> PortResult<Vec<ReflectionRecord>> {
        let request = self
            .client
            .get(self.url("/api/reflections/"))
            .query(&[("video_id", video_id)]);
        let body: Vec<ReflectionWire> = self.send_json(request).await?;

        let mut reflections: Vec<ReflectionRecord> =
            body.into_iter().map(ReflectionWire::into_domain).collect();
        reflections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reflections)
    }
}

//=========================================================================================
// Status Mapping
//=========================================================================================

fn transport_error(error: reqwest::Error) -> PortError {
    PortError::Transient(error.to_string())
}

/// Passes successful responses through and maps every other status onto a `PortError`.
async fn ensure_success(response: reqwest::Response) -> PortResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> PortError {
    let detail = error_detail(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    match status {
        StatusCode::NOT_FOUND => PortError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => PortError::Rejected(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PortError::Unauthorized,
        _ => PortError::Transient(detail),
    }
}

/// Pulls the human-readable reason out of an error body.
/// The service answers `{"detail": "..."}`, or a list of field errors on 422.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

#[derive(Serialize)]
struct ProgressUpdateBody {
    user_id: UserId,
    completion_percentage: u8,
    is_completed: bool,
}

#[derive(Serialize)]
struct ReflectionBody<'a> {
    content: &'a str,
    video_id: VideoId,
}

#[derive(Deserialize)]
struct VideoProgressBody {
    #[serde(default)]
    progress: Option<ProgressWire>,
}

#[derive(Deserialize)]
struct ProgressWire {
    #[serde(default)]
    completion_percentage: f64,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    last_watched_position: Option<f64>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl ProgressWire {
    fn into_domain(self, user_id: UserId, video_id: VideoId) -> ProgressRecord {
        let mut record = ProgressRecord::at(user_id, video_id, to_percent(self.completion_percentage));
        record.is_completed |= self.is_completed;
        record.last_watched_position_secs = self.last_watched_position.filter(|p| p.is_finite() && *p >= 0.0);
        record.last_persisted_at = self.updated_at.as_deref().and_then(parse_timestamp);
        record
    }
}

#[derive(Deserialize)]
struct PreviewBody {
    valid: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    quality_result: Option<QualityWire>,
    #[serde(default)]
    predicted_approval: bool,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Deserialize)]
struct QualityWire {
    quality_score: f64,
    #[serde(default)]
    quality_passed: bool,
}

impl PreviewBody {
    fn into_domain(self) -> PreviewResponse {
        PreviewResponse {
            valid: self.valid,
            quality_score: self.quality_result.as_ref().map(|q| to_percent(q.quality_score)),
            quality_passed: self.quality_result.as_ref().is_some_and(|q| q.quality_passed),
            predicted_approval: self.predicted_approval,
            error: self.error,
            feedback: self.feedback,
            suggestions: self.suggestions,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubmitBody {
    Wrapped { reflection: ReflectionWire },
    Bare(ReflectionWire),
}

#[derive(Deserialize)]
struct ReflectionWire {
    id: i64,
    user_id: UserId,
    video_id: VideoId,
    content: String,
    #[serde(default)]
    word_count: Option<usize>,
    #[serde(default)]
    quality_score: Option<f64>,
    #[serde(default)]
    is_approved: bool,
    #[serde(default)]
    feedback: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl ReflectionWire {
    fn into_domain(self) -> ReflectionRecord {
        let word_count = self.word_count.unwrap_or_else(|| self.content.chars().count());
        ReflectionRecord {
            id: self.id,
            user_id: self.user_id,
            video_id: self.video_id,
            word_count,
            content: self.content,
            quality_score: self.quality_score.unwrap_or(0.0),
            is_approved: self.is_approved,
            feedback: self.feedback,
            created_at: self.created_at.as_deref().and_then(parse_timestamp).unwrap_or_else(Utc::now),
        }
    }
}

fn to_percent(value: f64) -> u8 {
    if value.is_finite() {
        value.floor().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// Accepts RFC 3339 as well as the naive ISO timestamps the service emits, read as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}
