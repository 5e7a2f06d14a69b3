use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature material for the `client_signature` authentication grant.
///
/// Instead of sending the raw secret, the client proves possession of it by
/// signing `"{timestamp}\n{nonce}\n{data}"` with HMAC-SHA256 and sending the
/// hex digest alongside timestamp and nonce.
pub struct CredentialSigner {
    client_id: String,
    client_secret: String,
}

/// One-shot parameter set for a signed authentication request
#[derive(Debug, Clone)]
pub struct SignatureParams {
    pub timestamp: i64,
    pub nonce: String,
    pub signature: String,
}

impl CredentialSigner {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Produce signature params for the current instant with a fresh nonce
    pub fn signature_params(&self, data: &str) -> Result<SignatureParams, ExchangeError> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let signature = self.sign(timestamp, &nonce, data)?;

        Ok(SignatureParams {
            timestamp,
            nonce,
            signature,
        })
    }

    /// HMAC-SHA256 over `"{timestamp}\n{nonce}\n{data}"`, hex-encoded
    pub fn sign(&self, timestamp: i64, nonce: &str, data: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.client_secret.as_bytes())
            .map_err(|e| ExchangeError::AuthError(format!("Invalid client secret: {}", e)))?;

        mac.update(format!("{}\n{}\n{}", timestamp, nonce, data).as_bytes());
        let result = mac.finalize();

        Ok(hex::encode(result.into_bytes()))
    }
}
