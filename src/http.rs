//! Blocking HTTP transport for catalog and country lookups
//!
//! All remote calls made by this crate go through [`HttpClient`] so that tests
//! can substitute canned responses. The real client always carries a bounded
//! timeout; a hung service fails the resolution instead of stalling it.

use std::time::Duration;

use tracing::debug;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport failure. Callers map it onto the error kind of their concern
/// (catalog fetch vs. country lookup).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Trait for HTTP GET operations.
pub trait HttpClient {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// GET and decode the body as UTF-8 text.
    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let body = self.get(url)?;
        String::from_utf8(body)
            .map_err(|e| TransportError(format!("Response from {} is not UTF-8: {}", url, e)))
    }
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mirror-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(TransportError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| TransportError(format!("Failed to read response from {}: {}", url, e)))
    }
}
