//! services/host/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use reflection_core::{
    domain::{can_write_reflection, ProgressRecord, REQUIRED_WATCH_PERCENT},
    ports::PortError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        eligibility_handler,
    ),
    components(
        schemas(HealthResponse, EligibilityResponse)
    ),
    tags(
        (name = "Reflection Session Host", description = "Endpoints for the video reflection session host.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Whether the user may write a reflection for a video.
#[derive(Serialize, Deserialize, ToSchema, Debug, PartialEq)]
pub struct EligibilityResponse {
    pub completion_percent: u8,
    pub is_completed: bool,
    pub required_percent: u8,
    pub can_write_reflection: bool,
}

impl From<&ProgressRecord> for EligibilityResponse {
    fn from(record: &ProgressRecord) -> Self {
        Self {
            completion_percent: record.completion_percent,
            is_completed: record.is_completed,
            required_percent: REQUIRED_WATCH_PERCENT,
            can_write_reflection: can_write_reflection(record.completion_percent),
        }
    }
}

#[derive(Deserialize, IntoParams)]
pub struct EligibilityQuery {
    /// The user whose progress is checked.
    user_id: i64,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The host is running", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string() })
}

/// Check whether a reflection may be written for a video.
///
/// The answer is computed from progress freshly fetched from the scoring service.
/// A video the user never watched is 0% and not yet eligible.
#[utoipa::path(
    get,
    path = "/videos/{video_id}/eligibility",
    responses(
        (status = 200, description = "Current eligibility", body = EligibilityResponse),
        (status = 401, description = "The scoring service refused the credentials"),
        (status = 404, description = "The video does not exist or is not published"),
        (status = 502, description = "The scoring service could not be reached")
    ),
    params(
        ("video_id" = i64, Path, description = "The video being watched."),
        EligibilityQuery
    )
)]
pub async fn eligibility_handler(
    State(app_state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
    Query(query): Query<EligibilityQuery>,
) -> Result<Json<EligibilityResponse>, (StatusCode, String)> {
    let record = app_state.gateway.fetch_progress(query.user_id, video_id).await.map_err(|e| {
        error!(video_id, user_id = query.user_id, "Failed to fetch progress: {}", e);
        port_error_status(e)
    })?;
    Ok(Json(EligibilityResponse::from(&record)))
}

fn port_error_status(error: PortError) -> (StatusCode, String) {
    let status = match &error {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Rejected(_) => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Transient(_) => StatusCode::BAD_GATEWAY,
    };
    (status, error.to_string())
}
