// src/circle/mod.rs

// Client for Circle's developer-controlled wallets REST API
pub mod client;
pub use client::CircleClient;

pub mod entity_secret;
pub mod models;
