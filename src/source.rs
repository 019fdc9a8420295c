//! Catalog sources
//!
//! A [`CatalogSource`] hands the resolver the raw catalog document. The
//! resolver parses it exactly once per resolution.

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::info;

use crate::error::{MirrorError, Result};
use crate::http::HttpClient;

/// Default Gentoo distfiles mirror catalog.
pub const DEFAULT_CATALOG_URL: &str = "https://api.gentoo.org/mirrors/distfiles.xml";

/// Provides the raw mirror catalog document.
pub trait CatalogSource {
    /// Fetch the raw catalog text.
    fn fetch(&self) -> Result<String>;

    /// Human-readable location, for logs and error messages.
    fn location(&self) -> String;
}

/// Catalog served over HTTP(S).
pub struct HttpCatalogSource {
    http: Rc<dyn HttpClient>,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(http: Rc<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self) -> Result<String> {
        info!("Fetching mirror catalog from {}", self.url);
        self.http
            .get_text(&self.url)
            .map_err(|e| MirrorError::fetch(format!("Failed to fetch mirror catalog: {}", e)))
    }

    fn location(&self) -> String {
        self.url.clone()
    }
}

/// Catalog stored on the local filesystem.
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for FileCatalogSource {
    fn fetch(&self) -> Result<String> {
        info!("Reading mirror catalog from {:?}", self.path);
        fs::read_to_string(&self.path).map_err(|e| {
            MirrorError::fetch(format!(
                "Failed to read mirror catalog {:?}: {}",
                self.path, e
            ))
        })
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pick a source for a catalog location: URLs go over HTTP, anything else
/// is read as a path (a `file://` prefix is stripped).
pub fn from_location(http: Rc<dyn HttpClient>, location: &str) -> Box<dyn CatalogSource> {
    if let Some(path) = location.strip_prefix("file://") {
        Box::new(FileCatalogSource::new(path))
    } else if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpCatalogSource::new(http, location))
    } else {
        Box::new(FileCatalogSource::new(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;
    use std::io::Write;

    #[test]
    fn test_http_source_fetches_body() {
        let http = Rc::new(MockHttpClient::default().with("https://m/x.xml", "<mirrors/>"));
        let source = HttpCatalogSource::new(http, "https://m/x.xml");
        assert_eq!(source.fetch().unwrap(), "<mirrors/>");
        assert_eq!(source.location(), "https://m/x.xml");
    }

    #[test]
    fn test_http_source_failure_is_fetch_error() {
        let http = Rc::new(MockHttpClient::default().failing("https://m/x.xml", "timed out"));
        let source = HttpCatalogSource::new(http, "https://m/x.xml");
        let err = source.fetch().unwrap_err();
        assert!(matches!(err, MirrorError::Fetch(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_file_source_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<mirrors/>").unwrap();

        let source = FileCatalogSource::new(file.path());
        assert_eq!(source.fetch().unwrap(), "<mirrors/>");
    }

    #[test]
    fn test_file_source_missing_file() {
        let source = FileCatalogSource::new("/nonexistent/mirrors.xml");
        assert!(matches!(source.fetch(), Err(MirrorError::Fetch(_))));
    }

    #[test]
    fn test_from_location_dispatch() {
        let http: Rc<dyn HttpClient> = Rc::new(MockHttpClient::default());
        assert_eq!(
            from_location(http.clone(), "file:///tmp/m.xml").location(),
            "/tmp/m.xml"
        );
        assert_eq!(
            from_location(http.clone(), DEFAULT_CATALOG_URL).location(),
            DEFAULT_CATALOG_URL
        );
        assert_eq!(from_location(http, "m.xml").location(), "m.xml");
    }
}
