//! Resolver inputs and service endpoints
//!
//! [`Selection`] enumerates every knob of a resolution:
//!
//! | Field          | Effect |
//! |----------------|--------|
//! | `name`         | Narrow by mirror name prefix (highest priority) |
//! | `protocol`     | Restrict the whole catalog to one protocol before narrowing |
//! | `country`      | Narrow by country code or name |
//! | `region`       | Narrow by region (lowest priority) |
//! | `geo_loc`      | Fall back to IP geolocation when the result is empty or ambiguous |
//! | `requester_ip` | Geolocate this address instead of the caller's public IP |
//!
//! [`ServiceConfig`] says where the catalog and the two lookup services live.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{MirrorError, Result};
use crate::geo::{DEFAULT_COUNTRY_ENDPOINT, DEFAULT_GEO_ENDPOINT};
use crate::http::DEFAULT_TIMEOUT_SECS;
use crate::logic::selector::Criterion;
use crate::source::DEFAULT_CATALOG_URL;
use crate::types::Protocol;

/// Selection criteria for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    pub name: Option<String>,
    pub protocol: Option<Protocol>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub geo_loc: bool,
    pub requester_ip: Option<IpAddr>,
}

impl Selection {
    /// Parse a user-supplied protocol string, ignoring case.
    pub fn parse_protocol(raw: &str) -> Result<Protocol> {
        raw.trim().parse::<Protocol>().map_err(|_| {
            MirrorError::config(format!(
                "Unknown protocol '{}' (expected http, https, ftp or rsync)",
                raw
            ))
        })
    }

    /// Provided criteria in priority order. Blank values count as absent.
    pub fn criteria(&self) -> Vec<(Criterion, &str)> {
        [
            (Criterion::Name, &self.name),
            (Criterion::Country, &self.country),
            (Criterion::Region, &self.region),
        ]
        .into_iter()
        .filter_map(|(criterion, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (criterion, v))
        })
        .collect()
    }

    /// Overlay `other` on top of `self`: set fields in `other` win.
    pub fn merged_with(&self, other: &Selection) -> Selection {
        Selection {
            name: other.name.clone().or_else(|| self.name.clone()),
            protocol: other.protocol.or(self.protocol),
            country: other.country.clone().or_else(|| self.country.clone()),
            region: other.region.clone().or_else(|| self.region.clone()),
            geo_loc: self.geo_loc || other.geo_loc,
            requester_ip: other.requester_ip.or(self.requester_ip),
        }
    }
}

/// Where the catalog and lookup services live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Catalog location: an http(s) URL or a local path
    pub mirrors: String,
    /// IP geolocation endpoint
    pub geo_endpoint: String,
    /// Country metadata endpoint with a `{code}` placeholder
    pub country_endpoint: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            mirrors: DEFAULT_CATALOG_URL.to_string(),
            geo_endpoint: DEFAULT_GEO_ENDPOINT.to_string(),
            country_endpoint: DEFAULT_COUNTRY_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mirrors.trim().is_empty() {
            return Err(MirrorError::config("Mirror catalog location must be specified"));
        }
        if !is_http_url(&self.geo_endpoint) {
            return Err(MirrorError::config(format!(
                "Geolocation endpoint must be an http(s) URL: {}",
                self.geo_endpoint
            )));
        }
        if !is_http_url(&self.country_endpoint) || !self.country_endpoint.contains("{code}") {
            return Err(MirrorError::config(format!(
                "Country endpoint must be an http(s) URL containing {{code}}: {}",
                self.country_endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(MirrorError::config("Timeout must be at least one second"));
        }
        Ok(())
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_priority_order_and_blanks() {
        let selection = Selection {
            region: Some("Europe".to_string()),
            name: Some("  ".to_string()),
            country: Some("IT".to_string()),
            ..Selection::default()
        };
        assert_eq!(
            selection.criteria(),
            vec![(Criterion::Country, "IT"), (Criterion::Region, "Europe")]
        );
    }

    #[test]
    fn test_parse_protocol() {
        assert_eq!(Selection::parse_protocol("HTTPS").unwrap(), Protocol::Https);
        assert!(matches!(
            Selection::parse_protocol("gopher"),
            Err(MirrorError::Config(_))
        ));
    }

    #[test]
    fn test_merged_with_prefers_other() {
        let base = Selection {
            name: Some("GARR".to_string()),
            country: Some("IT".to_string()),
            protocol: Some(Protocol::Http),
            ..Selection::default()
        };
        let cli = Selection {
            country: Some("FR".to_string()),
            geo_loc: true,
            ..Selection::default()
        };
        let merged = base.merged_with(&cli);
        assert_eq!(merged.name.as_deref(), Some("GARR"));
        assert_eq!(merged.country.as_deref(), Some("FR"));
        assert_eq!(merged.protocol, Some(Protocol::Http));
        assert!(merged.geo_loc);
    }

    #[test]
    fn test_service_config_defaults_are_valid() {
        let services = ServiceConfig::default();
        assert!(services.validate().is_ok());
        assert_eq!(services.timeout_secs, 30);
    }

    #[test]
    fn test_service_config_rejects_bad_values() {
        let no_placeholder = ServiceConfig {
            country_endpoint: "https://restcountries.com/v2/alpha/".to_string(),
            ..ServiceConfig::default()
        };
        assert!(no_placeholder.validate().is_err());

        let zero_timeout = ServiceConfig {
            timeout_secs: 0,
            ..ServiceConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }
}
