// src/api/rpc.rs

use crate::{
    mcp::{handler::handle_mcp_request, protocol::parse_request},
    AppState,
};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// JSON-RPC over HTTP: one message per POST body.
/// Notifications are acknowledged with `202 Accepted` and no body.
pub async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(reply) => return (StatusCode::BAD_REQUEST, Json(reply)).into_response(),
    };
    match handle_mcp_request(request, state).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
