use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};

pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({"message": "Hello World"}))
}

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "pending_transfers": state.staging.pending_count()
    }))
}
