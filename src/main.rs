// src/main.rs

use anyhow::{Context, Result};
use circle_wallet_mcp::{api::create_router, config::Config, mcp::stdio, AppState};
use std::env;
use std::net::SocketAddr;
use tokio::io;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// --- HTTP Server Logic ---
async fn run_http_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let app = create_router(state);

    info!("🚀 Transaction server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("HTTP server stopped unexpectedly")
}

// --- MCP Server Logic ---
async fn run_mcp_server(state: AppState) -> Result<()> {
    info!("🚀 Starting MCP server on stdin/stdout...");
    let stdin = io::BufReader::new(io::stdin());
    stdio::serve(stdin, io::stdout(), state)
        .await
        .context("MCP transport failed")
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the MCP transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circle_wallet_mcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            return;
        }
    };

    if config.circle_api_key.is_none() {
        warn!("CIRCLE_API_KEY is not set; Circle API calls will fail");
    }

    let app_state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            error!("❌ Failed to initialize: {:#}", e);
            return;
        }
    };

    // Check if running in MCP mode (stdin/stdout) or HTTP server mode
    let args: Vec<String> = env::args().collect();
    let outcome = if args.contains(&"--mcp".to_string()) || env::var("MCP_MODE").is_ok() {
        run_mcp_server(app_state).await
    } else {
        run_http_server(app_state).await
    };
    if let Err(e) = outcome {
        error!("❌ {:#}", e);
    }
}
