// src/circle/entity_secret.rs
//
// Circle accepts each entitySecretCiphertext only once, so a new one is
// produced for every request: RSA-OAEP(SHA-256) over the raw secret with the
// entity public key, base64 encoded.

use crate::circle::models::UpstreamError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::{pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, Oaep, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

pub const ENTITY_SECRET_LEN: usize = 32;

/// Decodes the hex entity secret from configuration.
pub fn decode_entity_secret(secret_hex: &str) -> Result<Zeroizing<Vec<u8>>, UpstreamError> {
    let bytes = Zeroizing::new(
        hex::decode(secret_hex.trim())
            .map_err(|e| UpstreamError::InvalidEntitySecret(e.to_string()))?,
    );
    if bytes.len() != ENTITY_SECRET_LEN {
        return Err(UpstreamError::InvalidEntitySecret(format!(
            "expected {} bytes, got {}",
            ENTITY_SECRET_LEN,
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Parses the entity public key, SPKI or PKCS#1 PEM.
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey, UpstreamError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| UpstreamError::PublicKey(e.to_string()))
}

/// Encrypts `secret` for a single request.
pub fn encrypt_entity_secret(public_key: &RsaPublicKey, secret: &[u8]) -> Result<String, UpstreamError> {
    let ciphertext = public_key
        .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), secret)
        .map_err(|e| UpstreamError::Encryption(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}
