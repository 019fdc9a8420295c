//! Error handling module for the mirror resolver
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every failure is terminal for the resolution call that raised it: nothing
//! in this crate retries or substitutes a default.

use thiserror::Error;

/// Main error type for mirror resolution
#[derive(Error, Debug)]
pub enum MirrorError {
    /// Malformed catalog, or malformed JSON/XML returned by a remote service
    #[error("Parse error: {0}")]
    Parse(String),

    /// Network or service failure while resolving country information
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Explicit filters and/or geolocation fallback produced zero candidates
    #[error("No matching mirror: {0}")]
    NoMatch(String),

    /// Catalog could not be retrieved from its source
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Invalid selection or service configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for mirror resolution
pub type Result<T> = std::result::Result<T, MirrorError>;

// Convenient error constructors
impl MirrorError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a no-match error
    pub fn no_match(msg: impl Into<String>) -> Self {
        Self::NoMatch(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
