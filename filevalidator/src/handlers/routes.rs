use axum::{extract::State, response::IntoResponse, routing::{get, post}, Json, Router};

use super::{files::validate_upload, health::handle_health};
use crate::{models::request::ApiResponse, AppState};

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/validate", post(validate_upload))
}

async fn handle_root(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "app": state.app_name,
        "version": state.version,
        "endpoints": {
            "health": "/health",
            "validate": "/api/validate"
        }
    })))
}
