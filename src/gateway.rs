//! Tool operations exposed to the calling agent.
//!
//! Successful operations yield the upstream body verbatim. Failures are a
//! [`ToolError`], whose display text is what the agent sees. Nothing here can
//! move funds; transfers are only proposed, and executing one requires a human
//! to open the staged link.

use crate::{
    circle::{models::UpstreamError, CircleClient},
    config::Config,
};
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ToolError {
    /// The server is missing a setting the operation needs.
    #[error("Error: {0}")]
    Config(String),
    #[error("Exception when calling {target}: {cause}")]
    Transport { target: &'static str, cause: String },
}

impl From<UpstreamError> for ToolError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Transport(e) => {
                error!("Circle API request failed: {}", e);
                ToolError::Transport { target: "Circle API", cause: e.to_string() }
            }
            other => ToolError::Config(other.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ToolGateway {
    circle: CircleClient,
    http: Client,
    staging_base_url: String,
    wallet_ids: Vec<String>,
}

impl ToolGateway {
    pub fn new(config: &Config) -> Self {
        Self {
            circle: CircleClient::new(config),
            http: Client::new(),
            staging_base_url: config.staging_base_url.trim_end_matches('/').to_string(),
            wallet_ids: config.wallet_ids.clone(),
        }
    }

    /// Public key of the entity owning the API key.
    pub async fn get_public_key(&self) -> Result<String, ToolError> {
        Ok(self.circle.get_public_key().await?.body)
    }

    /// Token balances held by `wallet_id`.
    pub async fn get_balance(&self, wallet_id: &str) -> Result<String, ToolError> {
        Ok(self.circle.get_wallet_balances(wallet_id).await?.body)
    }

    pub fn get_wallet_ids(&self) -> Vec<String> {
        self.wallet_ids.clone()
    }

    /// Asks the staging server for an approval link. No funds move here.
    pub async fn prepare_transfer(
        &self,
        amount: &str,
        destination_address: &str,
        token_id: &str,
        wallet_id: &str,
    ) -> Result<String, ToolError> {
        info!(
            "Requesting approval link for {} {} from wallet {} to {}",
            amount, token_id, wallet_id, destination_address
        );
        let url = format!("{}/transaction", self.staging_base_url);
        let request = self.http.get(url).query(&[
            ("amounts", amount),
            ("destination_address", destination_address),
            ("token_id", token_id),
            ("wallet_id", wallet_id),
        ]);

        let result = match request.send().await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        };
        result.map_err(|e| {
            error!("Transaction server request failed: {}", e);
            ToolError::Transport { target: "transaction server", cause: e.to_string() }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_message_matches_convention() {
        assert_eq!(
            ToolError::from(UpstreamError::MissingApiKey).to_string(),
            "Error: CIRCLE_API_KEY environment variable must be set"
        );
    }

    #[test]
    fn transport_message_names_the_target() {
        let err = ToolError::Transport { target: "transaction server", cause: "refused".into() };
        assert_eq!(err.to_string(), "Exception when calling transaction server: refused");
    }

    #[test]
    fn wallet_ids_come_from_config() {
        let mut config = Config::default();
        let gateway = ToolGateway::new(&config);
        assert!(gateway.get_wallet_ids().is_empty());

        config.wallet_ids = vec!["a".into(), "b".into()];
        assert_eq!(ToolGateway::new(&config).get_wallet_ids(), vec!["a", "b"]);
    }
}
