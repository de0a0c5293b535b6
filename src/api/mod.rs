//! # API Module
//!
//! HTTP surface of the transfer staging server.
//!
//! ## Available Endpoints
//!
//! - `GET /` - Liveness greeting
//! - `GET /health` - Health check with the number of pending transfers
//! - `GET /transaction?amounts=&destination_address=&token_id=&wallet_id=` -
//!   Stage a transfer, returns `{"link": ...}`
//! - `GET /confirm?code=` - Execute a staged transfer
//! - `POST /rpc` - JSON-RPC bridge to the MCP tool gateway
//! - `/static/*` - Files from the configured static directory

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod health;
pub mod rpc;
pub mod transaction;

pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route("/transaction", get(transaction::stage_transaction_handler))
        .route("/confirm", get(transaction::confirm_handler))
        .route("/rpc", post(rpc::rpc_handler))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
