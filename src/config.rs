// src/config.rs

use std::env;
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CIRCLE_API_BASE_URL: &str = "https://api.circle.com";
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STATIC_DIR: &str = "static";

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,
    pub static_dir: String,

    /// Base of the confirmation links handed out by the staging server.
    pub public_base_url: String,
    /// Where the tool gateway reaches the staging server.
    pub staging_base_url: String,

    // Circle settings
    pub circle_api_base_url: String,
    /// `None` when `CIRCLE_API_KEY` is unset or blank.
    pub circle_api_key: Option<SecretString>,
    /// Entity-secret ciphertext attached to transfer creation requests.
    pub entity_secret: Option<SecretString>,

    /// Configured wallet identifiers, in `WALLET_ID`, `WALLET_ID2` order.
    pub wallet_ids: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: DEFAULT_STATIC_DIR.to_string(),
            public_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            staging_base_url: DEFAULT_LOCAL_BASE_URL.to_string(),
            circle_api_base_url: DEFAULT_CIRCLE_API_BASE_URL.to_string(),
            circle_api_key: None,
            entity_secret: None,
            wallet_ids: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset everywhere
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match non_blank("PORT") {
            Some(p) => p.parse().context("PORT must be a valid number")?,
            None => DEFAULT_PORT,
        };

        let public_base_url = non_blank("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string());
        Url::parse(&public_base_url).context("PUBLIC_BASE_URL must be an absolute URL")?;

        let staging_base_url = non_blank("STAGING_BASE_URL")
            .unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string());
        Url::parse(&staging_base_url).context("STAGING_BASE_URL must be an absolute URL")?;

        let circle_api_base_url = non_blank("CIRCLE_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_CIRCLE_API_BASE_URL.to_string());
        Url::parse(&circle_api_base_url)
            .context("CIRCLE_API_BASE_URL must be an absolute URL")?;

        let wallet_ids = ["WALLET_ID", "WALLET_ID2"]
            .iter()
            .filter_map(|key| non_blank(key))
            .collect();

        Ok(Config {
            port,
            static_dir: non_blank("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            public_base_url,
            staging_base_url,
            circle_api_base_url,
            circle_api_key: non_blank("CIRCLE_API_KEY").map(SecretString::new),
            entity_secret: non_blank("CIRCLE_ENTITY_SECRET").map(SecretString::new),
            wallet_ids,
        })
    }
}
