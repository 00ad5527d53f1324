//! CalTopo integration
//!
//! - `signer` - HMAC request signing
//! - `client` - signed GET/POST access behind the [`MapApi`] trait
//! - `template` - template map retrieval and sanitization
//! - `composer` - mission map creation
//! - `geo` - GeoJSON types and coordinate parsing

pub mod client;
pub mod composer;
pub mod credentials;
pub mod geo;
pub mod signer;
pub mod template;

pub use client::{ApiMethod, HttpMapApiClient, MapApi, MockMapApi, Timeouts};
pub use composer::{map_url, MapCreationResult, MissionMapComposer, MissionMapRequest};
pub use credentials::Credentials;
pub use geo::{parse_coordinate, Feature, FeatureCollection, LatLon, LonLat};
pub use signer::{RequestSigner, SignedRequestParams};
pub use template::TemplateFetcher;
