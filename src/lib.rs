// src/lib.rs

use std::sync::Arc;
use anyhow::{Context, Result};

// Re-export modules
pub mod api;
pub mod circle;
pub mod config;
pub mod gateway;
pub mod mcp;
pub mod staging;
pub mod utils;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Tool operations exposed over MCP
    pub gateway: gateway::ToolGateway,
    /// Stages transfers and executes them on confirmation
    pub staging: staging::StagingService,
}

impl AppState {
    /// Wires the gateway and a staging service backed by the in-memory store
    /// and the Circle API.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let executor = Arc::new(circle::CircleClient::new(&config));
        Self::with_executor(config, executor)
    }

    /// Same as [`AppState::from_config`] with a caller-supplied transfer executor.
    pub fn with_executor(
        config: config::Config,
        executor: Arc<dyn staging::TransferExecutor>,
    ) -> Result<Self> {
        let store = Arc::new(staging::InMemoryPendingStore::new());
        let staging = staging::StagingService::new(store, executor, &config.public_base_url)
            .context("PUBLIC_BASE_URL cannot be used for confirmation links")?;
        Ok(Self {
            gateway: gateway::ToolGateway::new(&config),
            staging,
            config,
        })
    }
}
