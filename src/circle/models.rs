// src/circle/models.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// --- Error types for upstream calls ---

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("CIRCLE_API_KEY environment variable must be set")]
    MissingApiKey,
    #[error("CIRCLE_ENTITY_SECRET environment variable must be set")]
    MissingEntitySecret,
    #[error("CIRCLE_ENTITY_SECRET must be a hex-encoded 32-byte secret: {0}")]
    InvalidEntitySecret(String),
    #[error("could not obtain the entity public key: {0}")]
    PublicKey(String),
    #[error("could not encrypt the entity secret: {0}")]
    Encryption(String),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

impl UpstreamError {
    /// Configuration problems, as opposed to failures of the call itself.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingApiKey | Self::MissingEntitySecret | Self::InvalidEntitySecret(_)
        )
    }
}

// --- Transfer Models ---

/// Parameters of a transfer waiting for human confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub amount: Decimal,
    pub destination_address: String,
    pub token_id: String,
    pub wallet_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeLevel {
    Low,
    Medium,
    High,
}

/// Request body of `POST /v1/w3s/developer/transactions/transfer`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCreation<'a> {
    pub idempotency_key: Uuid,
    pub entity_secret_ciphertext: &'a str,
    pub wallet_id: &'a str,
    pub token_id: &'a str,
    pub destination_address: &'a str,
    pub amounts: Vec<String>,
    pub fee_level: FeeLevel,
}

impl<'a> TransferCreation<'a> {
    pub fn new(
        transfer: &'a PendingTransfer,
        idempotency_key: Uuid,
        entity_secret_ciphertext: &'a str,
        fee_level: FeeLevel,
    ) -> Self {
        Self {
            idempotency_key,
            entity_secret_ciphertext,
            wallet_id: &transfer.wallet_id,
            token_id: &transfer.token_id,
            destination_address: &transfer.destination_address,
            amounts: vec![transfer.amount.to_string()],
            fee_level,
        }
    }
}

// --- Upstream responses ---

/// Raw response from the upstream API. The body is passed along untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamBody {
    pub status: u16,
    pub body: String,
}

impl UpstreamBody {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Server-side failures and throttling; the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        self.status == 429 || self.status >= 500
    }

    /// Parsed view of the body, if it is JSON at all.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}
