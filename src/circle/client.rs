// src/circle/client.rs

use crate::{
    circle::{
        entity_secret,
        models::{FeeLevel, PendingTransfer, TransferCreation, UpstreamBody, UpstreamError},
    },
    config::Config,
    staging::TransferExecutor,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, RequestBuilder};
use rsa::RsaPublicKey;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use uuid::Uuid;

/// Thin wrapper around Circle's developer-controlled wallets API.
/// Responses are returned as received; nothing is parsed here.
#[derive(Clone, Debug)]
pub struct CircleClient {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    entity_secret: Option<SecretString>,
}

impl CircleClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.circle_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.circle_api_key.clone(),
            entity_secret: config.entity_secret.clone(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, UpstreamError> {
        let api_key = self.api_key.as_ref().ok_or(UpstreamError::MissingApiKey)?;
        Ok(request
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(api_key.expose_secret()))
    }

    async fn send(request: RequestBuilder) -> Result<UpstreamBody, UpstreamError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Circle API responded with status {}", status);
        Ok(UpstreamBody { status, body })
    }

    /// `GET /v1/w3s/config/entity/publicKey`
    pub async fn get_public_key(&self) -> Result<UpstreamBody, UpstreamError> {
        let url = format!("{}/v1/w3s/config/entity/publicKey", self.base_url);
        let request = self.authorized(self.http.get(url))?;
        Self::send(request).await
    }

    /// `GET /v1/w3s/wallets/{id}/balances`
    pub async fn get_wallet_balances(&self, wallet_id: &str) -> Result<UpstreamBody, UpstreamError> {
        let url = format!("{}/v1/w3s/wallets/{}/balances", self.base_url, wallet_id);
        let request = self.authorized(self.http.get(url))?;
        Self::send(request).await
    }

    /// Fetches and parses `data.publicKey`, the key entity secrets are encrypted with.
    async fn entity_public_key(&self) -> Result<RsaPublicKey, UpstreamError> {
        let response = self.get_public_key().await?;
        if !response.is_success() {
            return Err(UpstreamError::PublicKey(format!(
                "status {}: {}",
                response.status, response.body
            )));
        }
        let pem = response
            .json()
            .and_then(|v| v["data"]["publicKey"].as_str().map(str::to_string))
            .ok_or_else(|| UpstreamError::PublicKey("response has no data.publicKey".into()))?;
        entity_secret::parse_public_key(&pem)
    }

    /// `POST /v1/w3s/developer/transactions/transfer`
    pub async fn create_transfer(
        &self,
        transfer: &PendingTransfer,
        idempotency_key: Uuid,
        fee_level: FeeLevel,
    ) -> Result<UpstreamBody, UpstreamError> {
        let entity_secret = self
            .entity_secret
            .as_ref()
            .ok_or(UpstreamError::MissingEntitySecret)?;
        let secret = entity_secret::decode_entity_secret(entity_secret.expose_secret())?;
        let public_key = self.entity_public_key().await?;
        let ciphertext = entity_secret::encrypt_entity_secret(&public_key, &secret)?;

        let url = format!("{}/v1/w3s/developer/transactions/transfer", self.base_url);
        let payload = TransferCreation::new(transfer, idempotency_key, &ciphertext, fee_level);

        info!(
            "Creating transfer of {} {} from wallet {} to {}",
            transfer.amount, transfer.token_id, transfer.wallet_id, transfer.destination_address
        );
        let request = self.authorized(self.http.post(url))?.json(&payload);
        Self::send(request).await
    }
}

#[async_trait]
impl TransferExecutor for CircleClient {
    async fn execute(
        &self,
        transfer: &PendingTransfer,
        idempotency_key: Uuid,
        fee_level: FeeLevel,
    ) -> Result<UpstreamBody, UpstreamError> {
        self.create_transfer(transfer, idempotency_key, fee_level).await
    }
}
