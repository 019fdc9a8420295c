//! Progressive mirror selector
//!
//! Narrows a catalog one criterion at a time and, when asked, falls back to
//! the requester's geographic location.
//!
//! # Narrowing Rules
//!
//! Criteria are applied in the fixed order `name > country > region`. Each
//! supplied criterion:
//!
//! - filters the baseline catalog when nothing has matched yet (unset or empty),
//! - filters the current candidates when they are ambiguous (more than one),
//! - is ignored once a single candidate remains.
//!
//! An empty result is kept as the new state; the next criterion starts
//! again from the baseline.
//!
//! # Geolocation Fallback
//!
//! | Candidates after criteria | Action |
//! |---------------------------|--------|
//! | none  | requester's country, then its neighbors depth-first |
//! | many  | filter once by the requester's region (may leave none) |
//! | one   | nothing |
//!
//! Every candidate set is a subset of the baseline, so the selector can
//! never produce a mirror that is not in the catalog it was given.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{MirrorError, Result};
use crate::geo::CountryLookup;
use crate::types::{CountryInfo, MirrorRecord};

/// A single-field narrowing criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Name,
    Country,
    Region,
}

impl Criterion {
    /// Apply this criterion's filter to `catalog`.
    pub fn apply(self, catalog: &Catalog, value: &str) -> Catalog {
        match self {
            Criterion::Name => catalog.by_name(value),
            Criterion::Country => catalog.by_country(value),
            Criterion::Region => catalog.by_region(value),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Country => write!(f, "country"),
            Self::Region => write!(f, "region"),
        }
    }
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    /// Chosen mirror
    pub record: MirrorRecord,
    /// How many candidates remained when the first was taken
    pub candidates: usize,
}

impl Selected {
    pub fn url(&self) -> &str {
        &self.record.url
    }
}

/// Ordered narrowing over a baseline catalog.
pub struct ProgressiveSelector<'c> {
    baseline: &'c Catalog,
    selected: Option<Catalog>,
}

impl<'c> ProgressiveSelector<'c> {
    /// Start with nothing selected.
    pub fn new(baseline: &'c Catalog) -> Self {
        Self {
            baseline,
            selected: None,
        }
    }

    /// Current candidates, `None` while no criterion has been applied.
    pub fn candidates(&self) -> Option<&Catalog> {
        self.selected.as_ref()
    }

    /// Number of current candidates (zero while unset).
    pub fn len(&self) -> usize {
        self.selected.as_ref().map_or(0, Catalog::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `criterion` if a value is given and the selection is not yet unique.
    ///
    /// Returns whether the filter was applied.
    pub fn fill(&mut self, criterion: Criterion, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };

        let next = match &self.selected {
            None => criterion.apply(self.baseline, value),
            Some(current) if current.is_empty() => criterion.apply(self.baseline, value),
            Some(current) if current.len() > 1 => criterion.apply(current, value),
            Some(_) => {
                debug!("Ignoring {}={}: mirror already unique", criterion, value);
                return false;
            }
        };

        debug!(
            "Applied {}={}: {} -> {} candidates",
            criterion,
            value,
            self.len(),
            next.len()
        );
        self.selected = Some(next);
        true
    }

    /// Geolocation fallback for an empty or ambiguous selection.
    ///
    /// The requester's country is looked up at most once through `lookup`.
    /// Any lookup failure aborts with that error.
    pub fn fill_with_geo_loc(
        &mut self,
        lookup: &mut CountryLookup<'_>,
        ip: Option<IpAddr>,
    ) -> Result<()> {
        if self.is_empty() {
            if self.baseline.is_empty() {
                debug!("Skipping geolocation: catalog has no candidates at all");
                return Ok(());
            }
            let requester = lookup.requester(ip)?;
            self.fill_with_neighbors(lookup, &requester)?;
        }

        if self.len() > 1 {
            let requester = lookup.requester(ip)?;
            self.narrow_by_region(&requester.region);
        }

        Ok(())
    }

    /// Depth-first search from `origin` through bordering countries,
    /// stopping at the first country with a cataloged mirror.
    fn fill_with_neighbors(
        &mut self,
        lookup: &mut CountryLookup<'_>,
        origin: &CountryInfo,
    ) -> Result<()> {
        let mut visited: HashSet<String> = HashSet::new();
        if self.search_country(lookup, origin, &mut visited)? {
            info!("Geolocation matched {} mirror(s)", self.len());
        } else {
            warn!(
                "No mirror found in {} or any reachable neighbor ({} countries searched)",
                origin.name,
                visited.len()
            );
        }
        Ok(())
    }

    fn search_country(
        &mut self,
        lookup: &mut CountryLookup<'_>,
        country: &CountryInfo,
        visited: &mut HashSet<String>,
    ) -> Result<bool> {
        visited.extend(country.codes());

        let matches = self.country_matches(country);
        debug!("Country {}: {} mirror(s)", country.code, matches.len());
        self.selected = Some(matches);
        if !self.is_empty() {
            return Ok(true);
        }

        for neighbor in &country.neighbors {
            let key = neighbor.to_ascii_uppercase();
            if visited.contains(&key) {
                continue;
            }
            let info = lookup.resolve_by_code(neighbor)?;
            if info.codes().iter().any(|c| visited.contains(c)) {
                visited.insert(key);
                continue;
            }
            visited.insert(key);
            if self.search_country(lookup, &info, visited)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Baseline mirrors in `country`, by code first, then by name.
    fn country_matches(&self, country: &CountryInfo) -> Catalog {
        country
            .codes()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(country.name.as_str()))
            .map(|key| self.baseline.by_country(key))
            .find(|c| !c.is_empty())
            .unwrap_or_default()
    }

    /// Single region filter over the current candidates. May leave none.
    fn narrow_by_region(&mut self, region: &str) {
        let Some(current) = &self.selected else {
            return;
        };
        let narrowed = current.by_region(region);
        debug!(
            "Narrowed by requester region {}: {} -> {} candidates",
            region,
            current.len(),
            narrowed.len()
        );
        self.selected = Some(narrowed);
    }

    /// Take the first candidate in iteration order.
    pub fn finish(self) -> Result<Selected> {
        let candidates = self.selected.unwrap_or_default();
        match candidates.first() {
            Some(record) => Ok(Selected {
                record: record.clone(),
                candidates: candidates.len(),
            }),
            None => Err(MirrorError::no_match("There are no matching mirrors")),
        }
    }
}
