//! Shared helpers for the host integration tests: an in-process stand-in for the
//! scoring service and builders for the host application.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use host_lib::adapters::HttpScoringGateway;
use host_lib::config::Config;
use host_lib::web::{router, AppState};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

pub const MISSING_VIDEO: i64 = 404;
pub const BROKEN_VIDEO: i64 = 500;
pub const PRIVATE_VIDEO: i64 = 403;

/// Recorded state of the fake scoring service.
#[derive(Default)]
pub struct Backend {
    pub progress: Mutex<HashMap<(i64, i64), f64>>,
    pub persisted: Mutex<Vec<Value>>,
    pub previews: Mutex<Vec<String>>,
    pub reflections: Mutex<Vec<Value>>,
    pub create_calls: Mutex<usize>,
    create_delay: Mutex<Duration>,
}

impl Backend {
    pub async fn set_progress(&self, user_id: i64, video_id: i64, percent: f64) {
        self.progress.lock().await.insert((user_id, video_id), percent);
    }

    /// Holds every reflection create for `delay` before answering.
    pub async fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().await = delay;
    }

    pub async fn add_reflection(&self, id: i64, video_id: i64, content: &str, created_at: &str) {
        self.reflections.lock().await.push(reflection_json(id, video_id, content, created_at));
    }
}

fn reflection_json(id: i64, video_id: i64, content: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "video_id": video_id,
        "content": content,
        "word_count": content.chars().count(),
        "quality_score": 72.5,
        "has_thought_words": true,
        "has_specific_examples": false,
        "has_questions": false,
        "is_approved": true,
        "feedback": null,
        "created_at": created_at,
        "reviewed_at": null
    })
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

//=========================================================================================
// Fake Scoring Service Routes
//=========================================================================================

#[derive(Deserialize)]
struct UserQuery {
    user_id: i64,
}

#[derive(Deserialize)]
struct VideoQuery {
    video_id: Option<i64>,
}

async fn get_progress(
    State(backend): State<Arc<Backend>>,
    Path(video_id): Path<i64>,
    Query(query): Query<UserQuery>,
) -> Response {
    match video_id {
        MISSING_VIDEO => return detail(StatusCode::NOT_FOUND, "视频不存在或未发布"),
        BROKEN_VIDEO => return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response(),
        PRIVATE_VIDEO => return detail(StatusCode::FORBIDDEN, "Not authenticated"),
        _ => {}
    }
    let progress = backend.progress.lock().await.get(&(query.user_id, video_id)).copied();
    let progress = progress.map(|percent| {
        json!({
            "completion_percentage": percent,
            "is_completed": percent >= 100.0,
            "last_watched_position": 42.5,
            "updated_at": "2024-05-01T09:15:00.250000"
        })
    });
    Json(json!({ "video": { "id": video_id }, "progress": progress })).into_response()
}

async fn post_progress(
    State(backend): State<Arc<Backend>>,
    Path(video_id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    if let (Some(user_id), Some(percent)) = (body["user_id"].as_i64(), body["completion_percentage"].as_f64()) {
        backend.progress.lock().await.insert((user_id, video_id), percent);
    }
    backend.persisted.lock().await.push(body.clone());
    Json(body).into_response()
}

async fn preview(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    let content = body["content"].as_str().unwrap_or_default().to_string();
    backend.previews.lock().await.push(content.clone());
    if content.chars().count() < 50 {
        return Json(json!({ "valid": false, "error": "观后感至少需要50个字" })).into_response();
    }
    Json(json!({
        "valid": true,
        "quality_result": { "quality_score": 81.7, "quality_passed": true },
        "predicted_approval": true,
        "feedback": "思考深入",
        "suggestions": ["可以结合具体例子"]
    }))
    .into_response()
}

async fn create_reflection(State(backend): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    *backend.create_calls.lock().await += 1;
    let delay = *backend.create_delay.lock().await;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    let content = body["content"].as_str().unwrap_or_default();
    let video_id = body["video_id"].as_i64().unwrap_or_default();
    if content.chars().count() < 50 {
        return detail(StatusCode::BAD_REQUEST, "观后感内容太短");
    }
    let mut reflections = backend.reflections.lock().await;
    let reflection = reflection_json(
        reflections.len() as i64 + 100,
        video_id,
        content,
        "2024-05-02T10:00:00",
    );
    reflections.push(reflection.clone());
    let body = json!({
        "reflection": reflection,
        "quality_analysis": { "quality_score": 72.5 },
        "approval_result": { "is_approved": true }
    });
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn list_reflections(State(backend): State<Arc<Backend>>, Query(query): Query<VideoQuery>) -> Response {
    let reflections = backend.reflections.lock().await;
    let listed: Vec<Value> = reflections
        .iter()
        .filter(|r| query.video_id.map_or(true, |id| r["video_id"].as_i64() == Some(id)))
        .cloned()
        .collect();
    Json(listed).into_response()
}

/// Starts the fake scoring service on an ephemeral port and returns its base URL.
pub async fn spawn_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/videos/{video_id}/progress", get(get_progress).post(post_progress))
        .route("/api/reflections/preview", axum::routing::post(preview))
        .route("/api/reflections/", get(list_reflections).post(create_reflection))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), backend)
}

//=========================================================================================
// Host Builders
//=========================================================================================

pub fn gateway(base_url: &str) -> Arc<HttpScoringGateway> {
    Arc::new(HttpScoringGateway::new(reqwest::Client::new(), base_url.to_string()))
}

pub fn test_config(base_url: &str) -> Config {
    let base_url = base_url.to_string();
    Config::from_lookup(move |name| match name {
        "SCORING_API_URL" => Some(base_url.clone()),
        _ => None,
    })
    .unwrap()
}

pub fn build_host_app(base_url: &str) -> Router {
    let state = AppState { gateway: gateway(base_url), config: Arc::new(test_config(base_url)) };
    router(Arc::new(state))
}

/// Serves the host on an ephemeral port and returns its address.
pub async fn spawn_host(base_url: &str) -> String {
    let app = build_host_app(base_url);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}
