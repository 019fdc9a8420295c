//! Country directory: IP geolocation and country metadata
//!
//! Two remote services are involved:
//!
//! | Trait              | Default service | Yields |
//! |--------------------|-----------------|--------|
//! | [`GeoLocator`]     | ip-api.com      | country code for an IP (or the caller) |
//! | [`CountryDirectory`] | restcountries | name, region, bordering countries |
//!
//! [`CountryLookup`] combines them for the span of one resolution and
//! memoizes every country it has seen. Nothing survives past that span.
//!
//! # Failure Policy
//!
//! No retries. A transport or service failure is a [`MirrorError::Lookup`],
//! a body that is not valid JSON is a [`MirrorError::Parse`]. Either aborts
//! the resolution in progress.

use std::collections::HashMap;
use std::net::IpAddr;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{MirrorError, Result};
use crate::http::HttpClient;
use crate::types::CountryInfo;

/// Default IP geolocation endpoint.
pub const DEFAULT_GEO_ENDPOINT: &str = "http://ip-api.com/json";

/// Default country metadata endpoint; `{code}` is replaced by the country code.
pub const DEFAULT_COUNTRY_ENDPOINT: &str = "https://restcountries.com/v2/alpha/{code}";

/// Maps an IP address to a country code.
pub trait GeoLocator {
    /// Country code for `ip`, or for the caller's public address when `None`.
    fn locate(&self, ip: Option<IpAddr>) -> Result<String>;
}

/// Looks up country metadata by code.
pub trait CountryDirectory {
    fn country(&self, code: &str) -> Result<CountryInfo>;
}

// ============================================================================
// ip-api.com
// ============================================================================

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

/// [`GeoLocator`] backed by an ip-api.com compatible endpoint.
pub struct IpApiLocator {
    http: Rc<dyn HttpClient>,
    endpoint: String,
}

impl IpApiLocator {
    pub fn new(http: Rc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    fn url_for(&self, ip: Option<IpAddr>) -> String {
        match ip {
            Some(ip) => format!("{}/{}", self.endpoint.trim_end_matches('/'), ip),
            None => self.endpoint.clone(),
        }
    }
}

impl GeoLocator for IpApiLocator {
    fn locate(&self, ip: Option<IpAddr>) -> Result<String> {
        let url = self.url_for(ip);
        let body = self
            .http
            .get_text(&url)
            .map_err(|e| MirrorError::lookup(format!("Failed to locate country from IP: {}", e)))?;

        let response: IpApiResponse = serde_json::from_str(&body).map_err(|e| {
            MirrorError::parse(format!("Malformed geolocation response from {}: {}", url, e))
        })?;

        if response.status.as_deref() == Some("fail") {
            return Err(MirrorError::lookup(format!(
                "Geolocation service refused the query: {}",
                response.message.as_deref().unwrap_or("unknown reason")
            )));
        }

        match response.country_code {
            Some(code) if !code.trim().is_empty() => {
                debug!("IP {:?} located in {}", ip, code);
                Ok(code.trim().to_string())
            }
            _ => Err(MirrorError::lookup(format!(
                "Geolocation response from {} carries no countryCode",
                url
            ))),
        }
    }
}

// ============================================================================
// restcountries
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestCountry {
    name: String,
    region: String,
    #[serde(default)]
    borders: Vec<String>,
    alpha2_code: Option<String>,
    alpha3_code: Option<String>,
}

/// Some deployments wrap the single country in an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RestPayload {
    One(RestCountry),
    Many(Vec<RestCountry>),
}

/// [`CountryDirectory`] backed by a restcountries compatible endpoint.
pub struct RestCountriesDirectory {
    http: Rc<dyn HttpClient>,
    endpoint: String,
}

impl RestCountriesDirectory {
    /// `endpoint` must contain a `{code}` placeholder.
    pub fn new(http: Rc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

impl CountryDirectory for RestCountriesDirectory {
    fn country(&self, code: &str) -> Result<CountryInfo> {
        let url = self.endpoint.replace("{code}", code);
        let body = self.http.get_text(&url).map_err(|e| {
            MirrorError::lookup(format!("Failed to read information for country {}: {}", code, e))
        })?;

        let payload: RestPayload = serde_json::from_str(&body).map_err(|e| {
            MirrorError::parse(format!("Malformed country metadata for {}: {}", code, e))
        })?;

        let country = match payload {
            RestPayload::One(country) => country,
            RestPayload::Many(list) => list.into_iter().next().ok_or_else(|| {
                MirrorError::lookup(format!("Country directory has no entry for {}", code))
            })?,
        };

        let (primary, alt) = match (country.alpha2_code, country.alpha3_code) {
            (Some(a2), a3) => (a2, a3),
            (None, Some(a3)) => (a3, None),
            (None, None) => (code.to_string(), None),
        };

        Ok(CountryInfo {
            code: primary,
            alt_code: alt,
            name: country.name,
            region: country.region,
            neighbors: country.borders,
        })
    }
}

// ============================================================================
// Lookup session
// ============================================================================

/// Country lookups for the duration of a single resolution.
pub struct CountryLookup<'a> {
    locator: &'a dyn GeoLocator,
    directory: &'a dyn CountryDirectory,
    cache: HashMap<String, CountryInfo>,
    requester: Option<CountryInfo>,
    remote_calls: usize,
}

impl<'a> CountryLookup<'a> {
    pub fn new(locator: &'a dyn GeoLocator, directory: &'a dyn CountryDirectory) -> Self {
        Self {
            locator,
            directory,
            cache: HashMap::new(),
            requester: None,
            remote_calls: 0,
        }
    }

    /// Country of `ip` (or of the caller), with region and neighbors.
    pub fn resolve_by_ip(&mut self, ip: Option<IpAddr>) -> Result<CountryInfo> {
        self.remote_calls += 1;
        let code = self.locator.locate(ip)?;
        self.resolve_by_code(&code)
    }

    /// Country metadata for `code`, served from the session cache when seen.
    pub fn resolve_by_code(&mut self, code: &str) -> Result<CountryInfo> {
        let key = code.to_ascii_uppercase();
        if let Some(info) = self.cache.get(&key) {
            return Ok(info.clone());
        }

        self.remote_calls += 1;
        let info = self.directory.country(code)?;
        debug!("Resolved country {}: {}", code, info);

        for alias in info.codes() {
            self.cache.insert(alias, info.clone());
        }
        self.cache.insert(key, info.clone());
        Ok(info)
    }

    /// The requester's country, located once per session.
    pub fn requester(&mut self, ip: Option<IpAddr>) -> Result<CountryInfo> {
        if let Some(info) = &self.requester {
            return Ok(info.clone());
        }
        let info = self.resolve_by_ip(ip)?;
        info!("Requester located in {}", info);
        self.requester = Some(info.clone());
        Ok(info)
    }

    /// Number of remote calls issued so far.
    pub fn remote_calls(&self) -> usize {
        self.remote_calls
    }
}
