use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::IssuanceError;

/// Generate an unguessable, URL-safe secret from `byte_len` bytes of OS
/// randomness.
pub fn generate_secret(byte_len: usize) -> Result<String, IssuanceError> {
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| IssuanceError::RandomFailure(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(&bytes))
}

/// Shortened form of a secret that is safe to put in logs.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{}…", prefix)
}
