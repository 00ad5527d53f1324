//! GeoJSON value types and coordinate handling
//!
//! Callers think in `[lat, lon]`; GeoJSON stores `[lon, lat]`. The only
//! place the two meet is [`LatLon::to_lon_lat`].

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Null for shapes like `GeometryCollection` that carry no coordinates
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub coordinates: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Geometry {
    pub fn point(position: LonLat) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: json!(position.to_array()),
            extra: Map::new(),
        }
    }
}

/// A single map feature. Keys this crate does not model are kept in `extra`
/// so template features round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// GeoJSON allows `"properties": null`
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Map<String, Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Feature {
    pub fn point(position: LonLat, properties: Map<String, Value>) -> Self {
        Self {
            kind: feature_type(),
            geometry: Some(Geometry::point(position)),
            properties,
            extra: Map::new(),
        }
    }

    /// Drop a key wherever it appears on the feature, root or properties
    pub fn remove_key(&mut self, key: &str) {
        self.extra.remove(key);
        self.properties.remove(key);
    }

    pub fn title(&self) -> Option<&str> {
        self.properties.get("title").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }
}

/// Caller-facing position, latitude first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// GeoJSON position, longitude first
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        validate(lat, lon)?;
        Ok(Self { lat, lon })
    }

    /// Accept exactly two finite numbers, `[lat, lon]`
    pub fn from_pair(pair: &[f64]) -> Result<Self> {
        match pair {
            [lat, lon] => Self::new(*lat, *lon),
            _ => Err(Error::Validation(format!(
                "coordinate must have exactly 2 values, got {}",
                pair.len()
            ))),
        }
    }

    /// Interpret a JSON field from an inbound request. Arrays must be
    /// `[lat, lon]`; strings go through [`parse_coordinate`].
    pub fn from_json(field: &str, value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let numbers: Option<Vec<f64>> = items.iter().map(Value::as_f64).collect();
                let numbers = numbers.ok_or_else(|| {
                    Error::Validation(format!("'{field}' must contain only numbers"))
                })?;
                Self::from_pair(&numbers)
                    .map_err(|e| Error::Validation(format!("'{field}': {}", validation_message(&e))))
            }
            Value::String(text) => parse_coordinate(text).ok_or_else(|| {
                Error::Validation(format!("'{field}' is not a recognised coordinate: {text}"))
            }),
            _ => Err(Error::Validation(format!(
                "'{field}' must be a [lat, lon] pair or coordinate string"
            ))),
        }
    }

    pub fn to_lon_lat(self) -> LonLat {
        LonLat {
            lon: self.lon,
            lat: self.lat,
        }
    }
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        validate(lat, lon)?;
        Ok(Self { lon, lat })
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

fn validate(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(Error::Validation(
            "coordinate values must be finite numbers".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&lat) {
        return Err(Error::Validation(format!("latitude {lat} out of range")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(Error::Validation(format!("longitude {lon} out of range")));
    }
    Ok(())
}

fn validation_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

static DD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?[0-9]+(?:\.[0-9]+)?)[,\s]+(-?[0-9]+(?:\.[0-9]+)?)$")
        .expect("Invalid regex pattern")
});

static DDM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(-?[0-9]+)[°\s]+([0-9]+(?:\.[0-9]+)?)['’]?\s*([NSEW])?")
        .expect("Invalid regex pattern")
});

/// Parse a human-entered coordinate in decimal degrees (`61.10478, -149.79553`)
/// or degrees and decimal minutes (`61°06.287' N, 149°47.732' W`,
/// `61 06.287 -149 47.732`). Returns `[lat, lon]`.
pub fn parse_coordinate(input: &str) -> Option<LatLon> {
    let clean = input.trim();
    if clean.is_empty() {
        return None;
    }

    if let Some(caps) = DD_REGEX.captures(clean) {
        let lat = caps[1].parse().ok()?;
        let lon = caps[2].parse().ok()?;
        return LatLon::new(lat, lon).ok();
    }

    let parts: Vec<&str> = clean.split(',').collect();
    if parts.len() == 2 {
        if let (Some(lat), Some(lon)) = (parse_ddm(parts[0]), parse_ddm(parts[1])) {
            return LatLon::new(lat, lon).ok();
        }
    }

    let parts: Vec<&str> = clean.split_whitespace().collect();
    if parts.len() == 4 {
        let lat = parse_ddm(&format!("{} {}", parts[0], parts[1]));
        let lon = parse_ddm(&format!("{} {}", parts[2], parts[3]));
        if let (Some(lat), Some(lon)) = (lat, lon) {
            return LatLon::new(lat, lon).ok();
        }
    }

    None
}

fn parse_ddm(component: &str) -> Option<f64> {
    let caps = DDM_REGEX.captures(component)?;
    let degrees_raw = &caps[1];
    let degrees: f64 = degrees_raw.trim_start_matches('-').parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    if minutes >= 60.0 {
        return None;
    }

    let southern_or_western = caps
        .get(3)
        .map(|m| matches!(m.as_str(), "S" | "s" | "W" | "w"))
        .unwrap_or(false);

    let value = degrees + minutes / 60.0;
    if degrees_raw.starts_with('-') || southern_or_western {
        Some(-value)
    } else {
        Some(value)
    }
}
