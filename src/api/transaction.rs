use crate::{
    circle::models::PendingTransfer,
    staging::StagingError,
    AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// Query string of GET /transaction. `amounts` keeps the name agents already use.
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub amounts: Decimal,
    pub destination_address: String,
    pub token_id: String,
    pub wallet_id: String,
}

impl From<TransactionQuery> for PendingTransfer {
    fn from(q: TransactionQuery) -> Self {
        PendingTransfer {
            amount: q.amounts,
            destination_address: q.destination_address,
            token_id: q.token_id,
            wallet_id: q.wallet_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub link: String,
}

/// GET /transaction: stage a transfer and hand back its confirmation link.
pub async fn stage_transaction_handler(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Json<LinkResponse> {
    let staged = state.staging.stage(query.into());
    Json(LinkResponse { link: staged.link })
}

/// GET /confirm: execute the transfer staged under `code`.
pub async fn confirm_handler(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    match state.staging.confirm(&query.code).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({"message": "Transaction confirmed"})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn upstream_json(body: &crate::circle::models::UpstreamBody) -> Value {
    body.json().unwrap_or_else(|| Value::String(body.body.clone()))
}

impl IntoResponse for StagingError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            StagingError::UnknownCode(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            StagingError::Retryable { upstream, .. } => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": message,
                    "retryable": true,
                    "upstream": upstream.as_ref().map(upstream_json),
                }),
            ),
            StagingError::Rejected(upstream) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "error": message,
                    "retryable": false,
                    "upstream": upstream_json(&upstream),
                }),
            ),
            StagingError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": message, "retryable": true }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
