//! CalTopo service-account credentials
//!
//! Loaded once at startup and shared read-only for the life of the process.

use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;

pub const ENV_CRED_ID: &str = "CALTOPO_CRED_ID";
pub const ENV_CRED_SECRET: &str = "CALTOPO_CRED_SECRET";
pub const ENV_TEAM_ID: &str = "CALTOPO_TEAM_ID";
pub const ENV_TEMPLATE_MAP_ID: &str = "CALTOPO_TEMPLATE_MAP_ID";

#[derive(Clone)]
pub struct Credentials {
    pub credential_id: String,
    pub credential_secret_base64: String,
    pub target_team_id: String,
    pub template_map_id: Option<String>,
    secret_key: Vec<u8>,
}

impl Credentials {
    /// Build credentials, decoding the secret up front so a malformed key
    /// fails at startup instead of on the first request.
    pub fn new(
        credential_id: impl Into<String>,
        credential_secret_base64: impl Into<String>,
        target_team_id: impl Into<String>,
        template_map_id: Option<String>,
    ) -> Result<Self> {
        let credential_id = credential_id.into();
        let credential_secret_base64 = credential_secret_base64.into();
        let target_team_id = target_team_id.into();

        let mut missing = Vec::new();
        if credential_id.trim().is_empty() {
            missing.push(ENV_CRED_ID);
        }
        if credential_secret_base64.trim().is_empty() {
            missing.push(ENV_CRED_SECRET);
        }
        if target_team_id.trim().is_empty() {
            missing.push(ENV_TEAM_ID);
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required CalTopo settings: {}",
                missing.join(", ")
            )));
        }

        let secret_key = decode_secret(&credential_secret_base64)?;
        let template_map_id = template_map_id.filter(|id| !id.trim().is_empty());

        Ok(Self {
            credential_id,
            credential_secret_base64,
            target_team_id,
            template_map_id,
            secret_key,
        })
    }

    /// Load credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::new(
            lookup(ENV_CRED_ID).unwrap_or_default(),
            lookup(ENV_CRED_SECRET).unwrap_or_default(),
            lookup(ENV_TEAM_ID).unwrap_or_default(),
            lookup(ENV_TEMPLATE_MAP_ID),
        )
    }

    /// Decoded HMAC key
    pub fn secret_key(&self) -> &[u8] {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("credential_id", &self.credential_id)
            .field("credential_secret_base64", &"<redacted>")
            .field("target_team_id", &self.target_team_id)
            .field("template_map_id", &self.template_map_id)
            .finish()
    }
}

pub(crate) fn decode_secret(secret_base64: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(secret_base64.trim())
        .map_err(|e| Error::Config(format!("Invalid Base64 Secret: {e}")))
}
