//! # caltopo-mission
//!
//! Creates CalTopo collaborative maps for search and rescue missions. Each
//! new map is seeded from a template map, stamped with a normalized mission
//! title and marked with the Last Known Point and Incident Command Post.
//!
//! ## Modules
//!
//! - `caltopo` - Signed CalTopo API client, template fetching and map composition
//! - `title` - Mission title normalization
//! - `server` - HTTP front door with admin authentication
//! - `app` - Configuration, logging and startup wiring
//! - `error` - Error types shared across the crate
pub mod app;
pub mod caltopo;
pub mod error;
pub mod server;
pub mod title;

pub use error::{Error, Result};
