//! HMAC request signing for the CalTopo API
//!
//! Every call carries `id`, `expires` and `signature` parameters. The
//! signature is HMAC-SHA256 over `"{METHOD} {ENDPOINT}\n{EXPIRES}\n{PAYLOAD}"`
//! keyed with the base64-decoded credential secret, then base64-encoded.

use crate::caltopo::credentials::{decode_secret, Credentials};
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// How long a signed request stays valid
pub const SIGNATURE_TTL_MS: i64 = 5 * 60 * 1000;

/// Query/form parameters attached to every signed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedRequestParams {
    pub id: String,
    pub expires: i64,
    pub signature: String,
}

#[derive(Clone)]
pub struct RequestSigner {
    credential_id: String,
    key: Vec<u8>,
}

impl RequestSigner {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            credential_id: credentials.credential_id.clone(),
            key: credentials.secret_key().to_vec(),
        }
    }

    /// Build a signer straight from a base64 secret
    pub fn from_base64(credential_id: impl Into<String>, secret_base64: &str) -> Result<Self> {
        Ok(Self {
            credential_id: credential_id.into(),
            key: decode_secret(secret_base64)?,
        })
    }

    /// Sign one request. `payload` is the exact serialized body, or "" when there is none.
    pub fn sign(&self, method: &str, endpoint: &str, expires_ms: i64, payload: &str) -> Result<String> {
        let message = format!("{method} {endpoint}\n{expires_ms}\n{payload}");
        hmac_base64(&self.key, message.as_bytes())
    }

    /// Produce the full parameter set for a request issued at `now_ms`
    pub fn signed_params(
        &self,
        method: &str,
        endpoint: &str,
        now_ms: i64,
        payload: &str,
    ) -> Result<SignedRequestParams> {
        let expires = expires_at(now_ms);
        let signature = self.sign(method, endpoint, expires, payload)?;
        Ok(SignedRequestParams {
            id: self.credential_id.clone(),
            expires,
            signature,
        })
    }
}

pub fn expires_at(now_ms: i64) -> i64 {
    now_ms + SIGNATURE_TTL_MS
}

fn hmac_base64(key: &[u8], message: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Config(format!("Unusable signing key: {e}")))?;
    mac.update(message);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "/api/v1/acct/123/CollaborativeMap";

    fn signer() -> RequestSigner {
        // "secret"
        RequestSigner::from_base64("CRED", "c2VjcmV0").unwrap()
    }

    #[test]
    fn test_rfc4231_case_2() {
        let sig = hmac_base64(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_known_post_signature() {
        let sig = signer().sign("POST", ENDPOINT, 1_700_000_000_000, "{}").unwrap();
        assert_eq!(sig, "3+ThrAbHhHX9ukY9+wurXgNC3kUDutXObBLjYJ5nYwc=");
    }

    #[test]
    fn test_known_get_signature_with_empty_payload() {
        let sig = signer()
            .sign("GET", "/api/v1/map/TMPL9/since/0", 1_700_000_000_000, "")
            .unwrap();
        assert_eq!(sig, "+V8JqIPNtNCV5NjZW7Zqcj0sKtAAn0apowIOxETnE6Y=");
    }

    #[test]
    fn test_signature_is_deterministic() {
        let s = signer();
        let a = s.sign("POST", ENDPOINT, 1_700_000_000_000, "{}").unwrap();
        let b = s.sign("POST", ENDPOINT, 1_700_000_000_000, "{}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_input_changes_signature() {
        let s = signer();
        let base = s.sign("POST", ENDPOINT, 1_700_000_000_000, "{}").unwrap();

        let variants = [
            s.sign("GET", ENDPOINT, 1_700_000_000_000, "{}").unwrap(),
            s.sign("POST", "/api/v1/acct/124/CollaborativeMap", 1_700_000_000_000, "{}")
                .unwrap(),
            s.sign("POST", ENDPOINT, 1_700_000_000_001, "{}").unwrap(),
            s.sign("POST", ENDPOINT, 1_700_000_000_000, "{ }").unwrap(),
        ];
        for variant in variants {
            assert_ne!(variant, base);
        }

        let other_key = RequestSigner::from_base64("CRED", "b3RoZXI=").unwrap();
        assert_ne!(
            other_key.sign("POST", ENDPOINT, 1_700_000_000_000, "{}").unwrap(),
            base
        );
    }

    #[test]
    fn test_signed_params_expire_five_minutes_out() {
        let params = signer()
            .signed_params("POST", ENDPOINT, 1_700_000_000_000, "{}")
            .unwrap();
        assert_eq!(params.id, "CRED");
        assert_eq!(params.expires, 1_700_000_300_000);
        assert_eq!(
            params.signature,
            signer()
                .sign("POST", ENDPOINT, 1_700_000_300_000, "{}")
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_base64_secret() {
        let err = RequestSigner::from_base64("CRED", "%%%").err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
