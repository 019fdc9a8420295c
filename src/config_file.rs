//! Configuration file handling for saving and loading resolver configs.
//!
//! A config file is JSON with two optional sections:
//!
//! ```json
//! {
//!   "selection": { "protocol": "https", "country": "IT", "geo_loc": true },
//!   "services": { "mirrors": "https://api.gentoo.org/mirrors/distfiles.xml", "timeout_secs": 10 }
//! }
//! ```
//!
//! Command-line flags are layered on top of whatever the file provides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::{Selection, ServiceConfig};

/// Resolver configuration that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub selection: Selection,
    pub services: ServiceConfig,
}

impl ResolverConfig {
    /// Create a new configuration with default services and no criteria
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.services
            .validate()
            .context("Invalid services section")?;

        for (criterion, value) in [
            ("name", &self.selection.name),
            ("country", &self.selection.country),
            ("region", &self.selection.region),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                anyhow::bail!("Selection {} must not be blank when given", criterion);
            }
        }

        if self.selection.requester_ip.is_some() && !self.selection.geo_loc {
            anyhow::bail!("requester_ip is only used when geo_loc is enabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Protocol;

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");

        let mut config = ResolverConfig::new();
        config.selection.country = Some("IT".to_string());
        config.selection.protocol = Some(Protocol::Https);
        config.services.timeout_secs = 5;
        config.save_to_file(&path).unwrap();

        let loaded = ResolverConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, r#"{"selection":{"protocol":"rsync","geo_loc":true}}"#).unwrap();

        let loaded = ResolverConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.selection.protocol, Some(Protocol::Rsync));
        assert!(loaded.selection.geo_loc);
        assert_eq!(loaded.services, ServiceConfig::default());
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_load_accepts_uppercase_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, r#"{"selection":{"protocol":"HTTPS","country":"IT"}}"#).unwrap();

        let loaded = ResolverConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.selection.protocol, Some(Protocol::Https));
    }

    #[test]
    fn test_load_rejects_unknown_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolver.json");
        fs::write(&path, r#"{"selection":{"protocol":"gopher"}}"#).unwrap();

        assert!(ResolverConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_criterion() {
        let mut config = ResolverConfig::new();
        config.selection.region = Some("   ".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_validate_rejects_ip_without_geo() {
        let mut config = ResolverConfig::new();
        config.selection.requester_ip = Some("8.8.8.8".parse().unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ResolverConfig::load_from_file("/nonexistent/resolver.json").is_err());
    }
}
