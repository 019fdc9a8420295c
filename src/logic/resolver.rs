//! Mirror resolver
//!
//! Composes catalog loading, protocol restriction, progressive narrowing and
//! geolocation fallback into one call that yields a single mirror URL.
//!
//! # Flow
//!
//! 1. Fetch and parse the catalog (once per call)
//! 2. Restrict to the requested protocol, if any
//! 3. Narrow by `name`, then `country`, then `region`
//! 4. Geolocation fallback, if enabled
//! 5. Take the first remaining mirror
//!
//! # What This Explicitly Refuses To Do
//!
//! - Probe mirrors for health or latency
//! - Cache anything between calls
//! - Retry a failed fetch or lookup

use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::catalog::{self, Catalog};
use crate::config::{Selection, ServiceConfig};
use crate::error::{MirrorError, Result};
use crate::geo::{CountryDirectory, CountryLookup, GeoLocator, IpApiLocator, RestCountriesDirectory};
use crate::http::{HttpClient, ReqwestClient};
use crate::logic::selector::{ProgressiveSelector, Selected};
use crate::source::{self, CatalogSource};
use crate::types::CountryInfo;

/// Resolves a selection against a catalog source.
///
/// Collaborators are injected at construction so tests can substitute
/// doubles for every remote call.
pub struct Resolver {
    source: Box<dyn CatalogSource>,
    locator: Box<dyn GeoLocator>,
    directory: Box<dyn CountryDirectory>,
}

impl Resolver {
    pub fn new(
        source: Box<dyn CatalogSource>,
        locator: Box<dyn GeoLocator>,
        directory: Box<dyn CountryDirectory>,
    ) -> Self {
        Self {
            source,
            locator,
            directory,
        }
    }

    /// Build a resolver talking to the services in `services` over HTTP.
    pub fn from_services(services: &ServiceConfig) -> Result<Self> {
        services.validate()?;

        let client = ReqwestClient::with_timeout(Duration::from_secs(services.timeout_secs))
            .map_err(|e| MirrorError::config(e.to_string()))?;
        let http: Rc<dyn HttpClient> = Rc::new(client);

        Ok(Self::new(
            source::from_location(http.clone(), &services.mirrors),
            Box::new(IpApiLocator::new(http.clone(), services.geo_endpoint.clone())),
            Box::new(RestCountriesDirectory::new(
                http,
                services.country_endpoint.clone(),
            )),
        ))
    }

    /// Fetch and parse the catalog.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let raw = self.source.fetch()?;
        catalog::parse(&raw)
    }

    /// Resolve `selection` to a single mirror.
    pub fn resolve(&self, selection: &Selection) -> Result<Selected> {
        let catalog = self.load_catalog()?;
        self.select(&catalog, selection)
    }

    /// Resolve `selection` against an already loaded catalog.
    pub fn select(&self, catalog: &Catalog, selection: &Selection) -> Result<Selected> {
        let baseline = match selection.protocol {
            Some(proto) => {
                let filtered = catalog.by_protocol(proto);
                debug!(
                    "Protocol {}: {} of {} mirrors",
                    proto,
                    filtered.len(),
                    catalog.len()
                );
                filtered
            }
            None => catalog.clone(),
        };

        let mut selector = ProgressiveSelector::new(&baseline);
        for (criterion, value) in selection.criteria() {
            selector.fill(criterion, Some(value));
        }

        if selection.geo_loc {
            let mut lookup = CountryLookup::new(self.locator.as_ref(), self.directory.as_ref());
            selector.fill_with_geo_loc(&mut lookup, selection.requester_ip)?;
            debug!("Geolocation used {} remote call(s)", lookup.remote_calls());
        }

        let selected = selector.finish()?;
        info!(
            "Selected {} (first of {} candidates)",
            selected.url(),
            selected.candidates
        );
        Ok(selected)
    }

    /// Country metadata for an IP (or the caller), outside of a resolution.
    pub fn country_by_ip(&self, ip: Option<IpAddr>) -> Result<CountryInfo> {
        CountryLookup::new(self.locator.as_ref(), self.directory.as_ref()).resolve_by_ip(ip)
    }

    /// Country metadata for a code, outside of a resolution.
    pub fn country_by_code(&self, code: &str) -> Result<CountryInfo> {
        CountryLookup::new(self.locator.as_ref(), self.directory.as_ref()).resolve_by_code(code)
    }

    pub fn source_location(&self) -> String {
        self.source.location()
    }
}
