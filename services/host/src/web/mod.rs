pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{routing::get, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use rest::{eligibility_handler, health_handler, ApiDoc};
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds the full router: REST endpoints, the session socket and the API docs.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_handler))
        .route("/videos/{video_id}/eligibility", get(eligibility_handler))
        .route("/ws", get(ws_handler))
        .with_state(app_state)
}
