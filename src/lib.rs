//! Mirror Resolver Library
//!
//! Deterministic download-mirror selection: ordered narrowing by name,
//! country and region over a parsed mirror catalog, with an optional
//! geolocation fallback that searches the requester's country and then its
//! neighbors.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod error;
pub mod geo;
pub mod http;
pub mod logic;
pub mod source;
pub mod types;

// Re-export main types for convenience
pub use catalog::{parse, Catalog};
pub use config::{Selection, ServiceConfig};
pub use config_file::ResolverConfig;
pub use error::{MirrorError, Result};
pub use geo::{CountryDirectory, CountryLookup, GeoLocator, IpApiLocator, RestCountriesDirectory};
pub use http::{HttpClient, ReqwestClient, TransportError};
pub use logic::resolver::Resolver;
pub use logic::selector::{Criterion, ProgressiveSelector, Selected};
pub use source::{CatalogSource, FileCatalogSource, HttpCatalogSource};
pub use types::{CountryInfo, MirrorRecord, Protocol};
