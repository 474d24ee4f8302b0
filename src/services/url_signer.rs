// src/services/url_signer.rs
//! HMAC-SHA256 signatures for time-limited blob links.

use crate::errors::HydraError;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, key: &str, expires_at: i64) -> Result<HmacSha256, HydraError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| HydraError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(key.as_bytes());
        mac.update(b"\n");
        mac.update(expires_at.to_string().as_bytes());
        Ok(mac)
    }

    /// URL-safe signature over `key` and its expiry.
    pub fn sign(&self, key: &str, expires_at: i64) -> Result<String, HydraError> {
        let tag = self.mac(key, expires_at)?.finalize().into_bytes();
        Ok(URL_SAFE_NO_PAD.encode(tag))
    }

    /// Accepts a link only when its signature matches and it has not expired.
    pub fn verify(
        &self,
        key: &str,
        expires_at: i64,
        signature: &str,
        now: i64,
    ) -> Result<(), HydraError> {
        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| HydraError::Forbidden("Malformed signature".to_string()))?;

        // verify_slice compares in constant time
        self.mac(key, expires_at)?
            .verify_slice(&tag)
            .map_err(|_| HydraError::Forbidden("Invalid signature".to_string()))?;

        if expires_at < now {
            return Err(HydraError::Forbidden("Link expired".to_string()));
        }
        Ok(())
    }
}
