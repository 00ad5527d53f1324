//! Runtime initialization and setup
//!
//! Builds the long-lived pieces once at startup: credentials, the shared
//! HTTP client and the composer.

use crate::app::{config::AppConfig, logging::init_logging};
use crate::caltopo::{Credentials, HttpMapApiClient, MissionMapComposer};
use crate::server::{AppState, PocketBaseVerifier, RateLimits};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Initialize the application with proper logging
pub fn initialize_app(config: &AppConfig) {
    init_logging(config);
}

/// Load credentials from the environment and wire up the composer
pub fn build_composer(client: reqwest::Client) -> Result<MissionMapComposer> {
    let credentials = Arc::new(Credentials::from_env()?);
    debug!("Loaded CalTopo credentials: {:?}", credentials);
    if credentials.template_map_id.is_none() {
        warn!("No template map configured; new maps will start empty");
    }

    let api = Arc::new(HttpMapApiClient::with_client(client, &credentials));
    Ok(MissionMapComposer::new(api, credentials))
}

/// Build the full server state. Fails fast on missing configuration.
pub fn build_state(config: &AppConfig) -> Result<AppState> {
    let client = reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    let composer = build_composer(client.clone())?;
    let verifier = PocketBaseVerifier::new(client, config.identity_url.clone());

    Ok(AppState {
        composer,
        verifier: Arc::new(verifier),
        limits: RateLimits::default(),
    })
}
