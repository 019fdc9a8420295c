//! Mirror catalog: XML loader and filter combinators
//!
//! The catalog is an ordered, url-keyed collection of [`MirrorRecord`]s.
//! Iteration order is the order the URIs appear in the source document and
//! every filter preserves it.
//!
//! # Source format
//!
//! ```xml
//! <mirrors>
//!   <mirrorgroup region="Europe" country="IT" countryname="Italy">
//!     <mirror>
//!       <name>GARR</name>
//!       <uri ipv4="y" ipv6="y" protocol="https">https://gentoo.mirror.garr.it/</uri>
//!     </mirror>
//!   </mirrorgroup>
//! </mirrors>
//! ```
//!
//! # Filters
//!
//! | Filter        | Field     | Match |
//! |---------------|-----------|-------|
//! | `by_name`     | `name`    | case-insensitive prefix |
//! | `by_protocol` | `protocol`| equality |
//! | `by_country`  | `country` / `country_name` | case-insensitive equality |
//! | `by_region`   | `region`  | case-insensitive equality |

use std::collections::HashMap;

use roxmltree::{Document, ParsingOptions};
use tracing::debug;

use crate::config::Selection;
use crate::error::{MirrorError, Result};
use crate::types::{MirrorRecord, Protocol};

/// Ordered set of mirrors keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<MirrorRecord>,
}

impl Catalog {
    /// Build a catalog from records, keeping url uniqueness.
    ///
    /// A url seen again keeps its first position but takes the later record.
    pub fn from_records(records: impl IntoIterator<Item = MirrorRecord>) -> Self {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut out: Vec<MirrorRecord> = Vec::new();

        for record in records {
            match index.get(&record.url) {
                Some(&pos) => out[pos] = record,
                None => {
                    index.insert(record.url.clone(), out.len());
                    out.push(record);
                }
            }
        }

        Self { records: out }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MirrorRecord> {
        self.records.iter()
    }

    /// First record in iteration order.
    pub fn first(&self) -> Option<&MirrorRecord> {
        self.records.first()
    }

    /// URLs in iteration order.
    pub fn urls(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.url.as_str()).collect()
    }

    pub fn get(&self, url: &str) -> Option<&MirrorRecord> {
        self.records.iter().find(|r| r.url == url)
    }

    /// True when every record here also appears, unchanged, in `other`.
    pub fn is_subset_of(&self, other: &Catalog) -> bool {
        self.records
            .iter()
            .all(|r| other.get(&r.url).is_some_and(|o| o == r))
    }

    /// Keep records whose name starts with `prefix`, ignoring case.
    pub fn by_name(&self, prefix: &str) -> Catalog {
        let prefix = prefix.to_lowercase();
        self.filter(|r| r.name.to_lowercase().starts_with(&prefix))
    }

    /// Keep records served over `proto`.
    pub fn by_protocol(&self, proto: Protocol) -> Catalog {
        self.filter(|r| r.protocol == proto)
    }

    /// Keep records located in `country`, given as code or long-form name.
    pub fn by_country(&self, country: &str) -> Catalog {
        self.filter(|r| {
            r.country.eq_ignore_ascii_case(country)
                || r.country_name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase() == country.to_lowercase())
        })
    }

    /// Keep records in `region`, ignoring case.
    pub fn by_region(&self, region: &str) -> Catalog {
        let region = region.to_lowercase();
        self.filter(|r| r.region.to_lowercase() == region)
    }

    /// Every criterion in `selection` applied to the whole catalog.
    ///
    /// Unlike progressive selection there is no priority: a unique match on
    /// one field does not stop the others from applying.
    pub fn matching_all(&self, selection: &Selection) -> Catalog {
        let mut listed = match selection.protocol {
            Some(proto) => self.by_protocol(proto),
            None => self.clone(),
        };
        for (criterion, value) in selection.criteria() {
            listed = criterion.apply(&listed, value);
        }
        listed
    }

    fn filter(&self, keep: impl Fn(&MirrorRecord) -> bool) -> Catalog {
        Catalog {
            records: self.records.iter().filter(|&r| keep(r)).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a MirrorRecord;
    type IntoIter = std::slice::Iter<'a, MirrorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a mirror catalog document.
///
/// Fails with [`MirrorError::Parse`] when the document is not well-formed,
/// when any `<uri>` has no URL text, or when a protocol is outside the
/// supported set. No filtering happens until the whole document parsed.
pub fn parse(raw: &str) -> Result<Catalog> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(raw, options)
        .map_err(|e| MirrorError::parse(format!("Malformed mirror catalog: {}", e)))?;

    let mut records = Vec::new();

    for group in doc.root_element().children().filter(|n| n.is_element()) {
        let country_name = group.attribute("countryname").map(str::to_string);
        let country = group
            .attribute("country")
            .map(str::to_string)
            .or_else(|| country_name.clone())
            .unwrap_or_default();
        let region = group.attribute("region").unwrap_or_default().to_string();

        for mirror in group.children().filter(|n| n.is_element()) {
            let name = mirror
                .children()
                .find(|n| n.has_tag_name("name"))
                .and_then(|n| n.text())
                .map(str::trim)
                .unwrap_or_default()
                .to_string();

            for uri in mirror.children().filter(|n| n.has_tag_name("uri")) {
                let url = uri.text().map(str::trim).unwrap_or_default();
                if url.is_empty() {
                    return Err(MirrorError::parse(format!(
                        "Mirror '{}' in country '{}' has a uri without url (line {})",
                        name,
                        country,
                        doc.text_pos_at(uri.range().start).row
                    )));
                }

                records.push(MirrorRecord {
                    url: url.to_string(),
                    name: name.clone(),
                    country: country.clone(),
                    country_name: country_name.clone(),
                    region: region.clone(),
                    supports_ipv4: parse_flag(uri.attribute("ipv4")),
                    supports_ipv6: parse_flag(uri.attribute("ipv6")),
                    protocol: parse_protocol(uri.attribute("protocol"), url)?,
                });
            }
        }
    }

    let catalog = Catalog::from_records(records);
    debug!("Parsed mirror catalog with {} entries", catalog.len());
    Ok(catalog)
}

/// Catalog flags are written as `y`/`n`.
fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("y" | "yes" | "true" | "1")
    )
}

/// Protocol attribute, falling back to the URL scheme when absent.
fn parse_protocol(attr: Option<&str>, url: &str) -> Result<Protocol> {
    let raw = match attr {
        Some(proto) => proto.trim(),
        None => url.split_once("://").map(|(scheme, _)| scheme).unwrap_or(""),
    };

    raw.parse::<Protocol>()
        .map_err(|_| MirrorError::parse(format!("Unsupported protocol '{}' for {}", raw, url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mirrors>
  <mirrorgroup region="Europe" country="IT" countryname="Italy">
    <mirror>
      <name>GARR</name>
      <uri ipv4="y" ipv6="y" protocol="https">https://gentoo.mirror.garr.it/</uri>
      <uri ipv4="y" ipv6="n" protocol="rsync">rsync://gentoo.mirror.garr.it/gentoo/</uri>
    </mirror>
  </mirrorgroup>
  <mirrorgroup region="Europe" country="FR" countryname="France">
    <mirror>
      <name>Gentoo Mirror FR</name>
      <uri ipv4="y" ipv6="n" protocol="ftp">ftp://ftp.free.fr/mirrors/gentoo/</uri>
    </mirror>
  </mirrorgroup>
  <mirrorgroup region="North America" country="US" countryname="USA">
    <mirror>
      <name>OSU Open Source Lab</name>
      <uri ipv4="y" ipv6="y" protocol="http">http://gentoo.osuosl.org/</uri>
    </mirror>
  </mirrorgroup>
</mirrors>"#;

    #[test]
    fn test_matching_all_applies_every_filter() {
        let catalog = parse(SAMPLE).unwrap();

        // A unique country match still gets the region filter.
        let selection = Selection {
            country: Some("us".to_string()),
            region: Some("Europe".to_string()),
            ..Selection::default()
        };
        assert!(catalog.matching_all(&selection).is_empty());

        let selection = Selection {
            protocol: Some(Protocol::Rsync),
            region: Some("europe".to_string()),
            ..Selection::default()
        };
        assert_eq!(
            catalog.matching_all(&selection).urls(),
            vec!["rsync://gentoo.mirror.garr.it/gentoo/"]
        );

        assert_eq!(catalog.matching_all(&Selection::default()), catalog);
    }

    #[test]
    fn test_parse_preserves_document_order() {
        let catalog = parse(SAMPLE).unwrap();
        assert_eq!(
            catalog.urls(),
            vec![
                "https://gentoo.mirror.garr.it/",
                "rsync://gentoo.mirror.garr.it/gentoo/",
                "ftp://ftp.free.fr/mirrors/gentoo/",
                "http://gentoo.osuosl.org/",
            ]
        );
    }

    #[test]
    fn test_parse_fields() {
        let catalog = parse(SAMPLE).unwrap();
        let garr = catalog.get("rsync://gentoo.mirror.garr.it/gentoo/").unwrap();
        assert_eq!(garr.name, "GARR");
        assert_eq!(garr.country, "IT");
        assert_eq!(garr.country_name.as_deref(), Some("Italy"));
        assert_eq!(garr.region, "Europe");
        assert!(garr.supports_ipv4);
        assert!(!garr.supports_ipv6);
        assert_eq!(garr.protocol, Protocol::Rsync);
    }

    #[test]
    fn test_parse_missing_url_fails() {
        let raw = r#"<mirrors><mirrorgroup country="IT" region="Europe">
            <mirror><name>Broken</name><uri protocol="http"></uri></mirror>
        </mirrorgroup></mirrors>"#;
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, MirrorError::Parse(_)));
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_parse_malformed_document_fails() {
        let err = parse("<mirrors><mirrorgroup>").unwrap_err();
        assert!(matches!(err, MirrorError::Parse(_)));
    }

    #[test]
    fn test_parse_unknown_protocol_fails() {
        let raw = r#"<mirrors><mirrorgroup country="IT" region="Europe">
            <mirror><name>Odd</name><uri protocol="gopher">gopher://odd/</uri></mirror>
        </mirrorgroup></mirrors>"#;
        assert!(matches!(parse(raw), Err(MirrorError::Parse(_))));
    }

    #[test]
    fn test_parse_protocol_from_scheme() {
        let raw = r#"<mirrors><mirrorgroup country="DE" region="Europe">
            <mirror><name>NoAttr</name><uri>https://example.de/gentoo</uri></mirror>
        </mirrorgroup></mirrors>"#;
        let catalog = parse(raw).unwrap();
        assert_eq!(catalog.first().unwrap().protocol, Protocol::Https);
        assert!(!catalog.first().unwrap().supports_ipv4);
    }

    #[test]
    fn test_parse_duplicate_url_keeps_first_position() {
        let raw = r#"<mirrors>
          <mirrorgroup country="IT" region="Europe">
            <mirror><name>A</name><uri protocol="http">http://a/</uri></mirror>
            <mirror><name>B</name><uri protocol="http">http://b/</uri></mirror>
          </mirrorgroup>
          <mirrorgroup country="FR" region="Europe">
            <mirror><name>A2</name><uri protocol="http">http://a/</uri></mirror>
          </mirrorgroup>
        </mirrors>"#;
        let catalog = parse(raw).unwrap();
        assert_eq!(catalog.urls(), vec!["http://a/", "http://b/"]);
        assert_eq!(catalog.first().unwrap().name, "A2");
        assert_eq!(catalog.first().unwrap().country, "FR");
    }

    #[test]
    fn test_by_name_prefix_case_insensitive() {
        let catalog = parse(SAMPLE).unwrap();
        assert_eq!(catalog.by_name("garr").len(), 2);
        assert_eq!(catalog.by_name("GENTOO mirror").len(), 1);
        assert!(catalog.by_name("mirror").is_empty());
    }

    #[test]
    fn test_by_protocol() {
        let catalog = parse(SAMPLE).unwrap();
        let https = catalog.by_protocol(Protocol::Https);
        assert_eq!(https.urls(), vec!["https://gentoo.mirror.garr.it/"]);
    }

    #[test]
    fn test_by_country_matches_code_or_name() {
        let catalog = parse(SAMPLE).unwrap();
        assert_eq!(catalog.by_country("it").len(), 2);
        assert_eq!(catalog.by_country("FRANCE").len(), 1);
        assert!(catalog.by_country("I").is_empty());
    }

    #[test]
    fn test_by_region_is_exact() {
        let catalog = parse(SAMPLE).unwrap();
        assert_eq!(catalog.by_region("europe").len(), 3);
        assert!(catalog.by_region("North").is_empty());
    }

    #[test]
    fn test_filters_preserve_order_and_subset() {
        let catalog = parse(SAMPLE).unwrap();
        let europe = catalog.by_region("Europe");
        assert!(europe.is_subset_of(&catalog));
        assert_eq!(europe.urls(), catalog.urls()[..3].to_vec());
    }
}
