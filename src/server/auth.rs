//! Admin authentication against the identity service

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub const ADMIN_ROLE: &str = "Admin";
pub const DEFAULT_IDENTITY_URL: &str = "http://rescue-respond:8090";

/// The `record` portion of an auth-refresh response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

#[derive(Debug, Deserialize)]
struct AuthRefreshResponse {
    record: AuthenticatedUser,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve an `Authorization` header to a user, or `None` if it is not valid
    async fn verify(&self, authorization: &str) -> Option<AuthenticatedUser>;
}

pub struct PocketBaseVerifier {
    client: Client,
    base_url: String,
}

impl PocketBaseVerifier {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for PocketBaseVerifier {
    async fn verify(&self, authorization: &str) -> Option<AuthenticatedUser> {
        let url = format!("{}/api/collections/users/auth-refresh", self.base_url);
        let response = match self
            .client
            .post(&url)
            .header("Authorization", authorization)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Auth check failed: {}", e);
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            return None;
        }

        match response.json::<AuthRefreshResponse>().await {
            Ok(body) => Some(body.record),
            Err(e) => {
                warn!("Auth check returned an unreadable body: {}", e);
                None
            }
        }
    }
}

/// Fixed token → user table for tests and local runs
#[derive(Debug, Default, Clone)]
pub struct StaticVerifier {
    users: HashMap<String, AuthenticatedUser>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, authorization: &str, user: AuthenticatedUser) -> Self {
        self.users.insert(authorization.to_string(), user);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, authorization: &str) -> Option<AuthenticatedUser> {
        self.users.get(authorization).cloned()
    }
}
