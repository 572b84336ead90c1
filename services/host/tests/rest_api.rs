//! Integration tests for the REST endpoints of the host.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::{build_host_app, spawn_backend, BROKEN_VIDEO, MISSING_VIDEO};
use serde_json::Value;
use tower::ServiceExt;

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn eligibility_follows_watch_progress() {
    let (base, backend) = spawn_backend().await;
    backend.set_progress(1, 3, 49.0).await;
    backend.set_progress(2, 3, 50.0).await;

    let below = body_json(get(build_host_app(&base), "/videos/3/eligibility?user_id=1").await).await;
    assert_eq!(below["completion_percent"], 49);
    assert_eq!(below["required_percent"], 50);
    assert_eq!(below["can_write_reflection"], false);

    let at = body_json(get(build_host_app(&base), "/videos/3/eligibility?user_id=2").await).await;
    assert_eq!(at["can_write_reflection"], true);
}

#[tokio::test]
async fn unwatched_video_is_not_eligible() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), "/videos/3/eligibility?user_id=1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["completion_percent"], 0);
    assert_eq!(body["is_completed"], false);
    assert_eq!(body["can_write_reflection"], false);
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), &format!("/videos/{MISSING_VIDEO}/eligibility?user_id=1")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn scoring_outage_is_bad_gateway() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), &format!("/videos/{BROKEN_VIDEO}/eligibility?user_id=1")).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn eligibility_requires_user() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), "/videos/3/eligibility").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_lists_endpoints() {
    let (base, _backend) = spawn_backend().await;

    let response = get(build_host_app(&base), "/api-docs/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/health"].is_object());
    assert!(doc["paths"]["/videos/{video_id}/eligibility"]["get"]["responses"]["404"].is_object());
}
