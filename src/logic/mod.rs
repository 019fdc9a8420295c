//! Logic modules — turns a catalog and a selection into one mirror.
//!
//! # Modules
//!
//! - `selector` — Progressive narrowing and geolocation fallback
//! - `resolver` — Fetch, parse, restrict and select in one call

pub mod resolver;
pub mod selector;
