//! Template map retrieval

use crate::caltopo::client::{ApiMethod, MapApi};
use crate::caltopo::geo::{Feature, FeatureCollection};
use crate::error::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Keys that tie a feature to the template map and must not be copied
const INSTANCE_KEYS: [&str; 2] = ["id", "folderId"];

pub struct TemplateFetcher {
    api: Arc<dyn MapApi>,
    template_map_id: Option<String>,
}

impl TemplateFetcher {
    pub fn new(api: Arc<dyn MapApi>, template_map_id: Option<String>) -> Self {
        Self {
            api,
            template_map_id,
        }
    }

    pub fn template_map_id(&self) -> Option<&str> {
        self.template_map_id.as_deref()
    }

    /// Fetch the sanitized template, substituting an empty collection on any
    /// failure. A broken template never blocks map creation.
    pub async fn fetch(&self) -> FeatureCollection {
        match self.try_fetch().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to fetch template: {}", e);
                FeatureCollection::empty()
            }
        }
    }

    /// Fetch the sanitized template, surfacing errors
    pub async fn try_fetch(&self) -> Result<FeatureCollection> {
        let Some(template_id) = self.template_map_id.as_deref() else {
            warn!("CALTOPO_TEMPLATE_MAP_ID not set. Using empty state.");
            return Ok(FeatureCollection::empty());
        };

        let endpoint = format!("/api/v1/map/{template_id}/since/0");
        let response = self.api.send(ApiMethod::Get, &endpoint, None).await?;

        let state = response
            .get("result")
            .and_then(|result| result.get("state"))
            .cloned()
            .ok_or_else(|| {
                Error::UnexpectedResponse("template response has no result.state".to_string())
            })?;

        let mut collection = parse_state(state)?;
        sanitize(&mut collection);
        debug!(
            "Fetched template {} with {} features",
            template_id,
            collection.len()
        );
        Ok(collection)
    }
}

/// Features that do not parse are skipped so the rest of the template survives
fn parse_state(state: Value) -> Result<FeatureCollection> {
    let Value::Object(mut extra) = state else {
        return Err(Error::UnexpectedResponse(
            "template state is not an object".to_string(),
        ));
    };

    let raw_features = match extra.remove("features") {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(Error::UnexpectedResponse(
                "template features is not an array".to_string(),
            ))
        }
    };

    let mut features = Vec::with_capacity(raw_features.len());
    for (index, raw) in raw_features.into_iter().enumerate() {
        match serde_json::from_value::<Feature>(raw) {
            Ok(feature) => features.push(feature),
            Err(e) => warn!("Skipping template feature {}: {}", index, e),
        }
    }

    Ok(FeatureCollection { features, extra })
}

/// Remove instance-specific identifiers from every feature
pub fn sanitize(collection: &mut FeatureCollection) {
    for feature in &mut collection.features {
        for key in INSTANCE_KEYS {
            feature.remove_key(key);
        }
    }
}
