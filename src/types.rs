//! Type-safe mirror and country types
//!
//! Catalog records are parsed once into these types and never mutated
//! afterwards. Filtering produces new collections of clones.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

/// Transfer protocol advertised by a mirror URI
///
/// Serialized lowercase; deserialized through [`FromStr`](std::str::FromStr),
/// so `"HTTPS"` in a config file reads the same as `"https"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Protocol {
    Http,
    Https,
    Ftp,
    Rsync,
}

impl Protocol {
    /// Get the protocol name as it appears in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Ftp => "ftp",
            Protocol::Rsync => "rsync",
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = strum::ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.trim().parse()
    }
}

/// A single mirror URI from the catalog.
///
/// One `<mirror>` element with several `<uri>` children yields one record
/// per URI; they share `name`, `country` and `region`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorRecord {
    /// Mirror URL, unique within a catalog
    pub url: String,
    /// Human-readable mirror operator name
    pub name: String,
    /// Country code of the enclosing mirror group (e.g. "IT")
    pub country: String,
    /// Long-form country name, when the catalog publishes one
    pub country_name: Option<String>,
    /// Region of the enclosing mirror group (e.g. "Europe")
    pub region: String,
    pub supports_ipv4: bool,
    pub supports_ipv6: bool,
    pub protocol: Protocol,
}

impl fmt::Display for MirrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({}, {})",
            self.url, self.protocol, self.name, self.country, self.region
        )
    }
}

/// Country metadata returned by the country directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInfo {
    /// Primary country code (ISO 3166-1 alpha-2 when available)
    pub code: String,
    /// Alternate code the directory reports (usually alpha-3)
    pub alt_code: Option<String>,
    pub name: String,
    pub region: String,
    /// Bordering countries, in the order the directory lists them
    pub neighbors: Vec<String>,
}

impl CountryInfo {
    /// All codes this country is known under, upper-cased.
    pub fn codes(&self) -> Vec<String> {
        let mut codes = vec![self.code.to_ascii_uppercase()];
        if let Some(alt) = &self.alt_code {
            codes.push(alt.to_ascii_uppercase());
        }
        codes
    }
}

impl fmt::Display for CountryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}), region {}", self.name, self.code, self.region)?;
        if !self.neighbors.is_empty() {
            write!(f, ", neighbors {}", self.neighbors.join(","))?;
        }
        Ok(())
    }
}
