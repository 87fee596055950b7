use axum::{extract::State, response::IntoResponse, Json};

use crate::{models::request::ApiResponse, AppState};

pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let mut fields: Vec<&str> = state.validator.field_names().collect();
    fields.sort_unstable();

    Json(ApiResponse::success(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().timestamp(),
        "version": state.version,
        "fields": fields,
    })))
}
