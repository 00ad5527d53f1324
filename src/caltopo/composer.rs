//! Mission map creation
//!
//! Seeds a new collaborative map from the template, drops LKP/ICP markers
//! on it and hands back the new map's id and URL.

use crate::caltopo::client::{ApiMethod, MapApi};
use crate::caltopo::credentials::Credentials;
use crate::caltopo::geo::{Feature, FeatureCollection, LatLon, LonLat};
use crate::caltopo::template::TemplateFetcher;
use crate::error::{Error, Result};
use crate::title::{self, Clock, SystemClock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

pub const MAP_URL_BASE: &str = "https://caltopo.com/m/";

pub const LKP_MARKER_SYMBOL: &str = "star";
pub const ICP_MARKER_SYMBOL: &str = "flag";
pub const MARKER_COLOR: &str = "FF0000";

/// Inbound request as posted by the dispatch UI. Coordinates are `[lat, lon]`
/// pairs or coordinate strings and are validated by [`MissionMapRequest::lkp_position`]
/// and friends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MissionMapRequest {
    pub title: Option<String>,
    pub location: Option<String>,
    pub lkp: Option<Value>,
    pub icp: Option<Value>,
}

impl MissionMapRequest {
    pub fn validated_title(&self) -> Result<&str> {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Validation("Missing 'title' field".to_string()))
    }

    pub fn lkp_position(&self) -> Result<Option<LonLat>> {
        optional_position("lkp", self.lkp.as_ref())
    }

    pub fn icp_position(&self) -> Result<Option<LonLat>> {
        optional_position("icp", self.icp.as_ref())
    }
}

fn optional_position(field: &str, value: Option<&Value>) -> Result<Option<LonLat>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(v) => LatLon::from_json(field, v).map(|p| Some(p.to_lon_lat())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapCreationResult {
    pub map_id: String,
    pub map_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapProperties {
    pub title: String,
    pub mode: String,
    pub sharing: String,
    #[serde(rename = "mapConfig")]
    pub map_config: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapCreationPayload {
    pub properties: MapProperties,
    pub state: FeatureCollection,
}

impl MapCreationPayload {
    pub fn new(title: String, state: FeatureCollection) -> Self {
        Self {
            properties: MapProperties {
                title,
                mode: "sar".to_string(),
                sharing: "SECRET".to_string(),
                map_config: json!({"activeLayers": [["mbt", 1]]}).to_string(),
            },
            state,
        }
    }
}

pub fn map_url(map_id: &str) -> String {
    format!("{MAP_URL_BASE}{map_id}")
}

pub fn lkp_marker(position: LonLat) -> Feature {
    marker(position, "LKP", "Last Known Point", LKP_MARKER_SYMBOL)
}

pub fn icp_marker(position: LonLat) -> Feature {
    marker(position, "ICP", "Incident Command Post", ICP_MARKER_SYMBOL)
}

fn marker(position: LonLat, title: &str, description: &str, symbol: &str) -> Feature {
    let mut properties = Map::new();
    properties.insert("title".into(), json!(title));
    properties.insert("description".into(), json!(description));
    properties.insert("marker-symbol".into(), json!(symbol));
    properties.insert("marker-color".into(), json!(MARKER_COLOR));
    Feature::point(position, properties)
}

pub struct MissionMapComposer {
    api: Arc<dyn MapApi>,
    credentials: Arc<Credentials>,
    templates: TemplateFetcher,
    clock: Arc<dyn Clock>,
}

impl MissionMapComposer {
    pub fn new(api: Arc<dyn MapApi>, credentials: Arc<Credentials>) -> Self {
        let templates = TemplateFetcher::new(api.clone(), credentials.template_map_id.clone());
        Self {
            api,
            credentials,
            templates,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn templates(&self) -> &TemplateFetcher {
        &self.templates
    }

    /// Validate an inbound request, convert its coordinates and create the map
    pub async fn create_from_request(
        &self,
        request: &MissionMapRequest,
    ) -> Result<MapCreationResult> {
        let title = request.validated_title()?;
        let lkp = request.lkp_position()?;
        let icp = request.icp_position()?;
        self.create_mission_map(title, lkp, icp).await
    }

    /// Create a mission map. Coordinates are already `[lon, lat]`.
    pub async fn create_mission_map(
        &self,
        title: &str,
        lkp: Option<LonLat>,
        icp: Option<LonLat>,
    ) -> Result<MapCreationResult> {
        let mission_title = title::normalize(title, &self.clock.now());
        info!("Creating map: {}", mission_title);

        let mut state = self.templates.fetch().await;
        if let Some(position) = lkp {
            state.push(lkp_marker(position));
        }
        if let Some(position) = icp {
            state.push(icp_marker(position));
        }

        let payload = serde_json::to_value(MapCreationPayload::new(mission_title, state))?;
        let endpoint = format!(
            "/api/v1/acct/{}/CollaborativeMap",
            self.credentials.target_team_id
        );
        let response = self
            .api
            .send(ApiMethod::Post, &endpoint, Some(&payload))
            .await?;

        let map_id = extract_map_id(&response)?;
        info!("Success! Map ID: {}", map_id);

        Ok(MapCreationResult {
            map_url: map_url(&map_id),
            map_id,
        })
    }
}

fn extract_map_id(response: &Value) -> Result<String> {
    response
        .get("result")
        .and_then(|r| r.get("id"))
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::UnexpectedResponse("map creation response has no result.id".to_string())
        })
}
