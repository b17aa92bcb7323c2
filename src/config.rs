//! Session configuration: interface name, routes and enabled families.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::adapter::validate_name;
use crate::family::AddressFamily;
use crate::prefix::RoutePrefix;

/// Tunnel session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelConfig {
    /// Requested interface name; the kernel picks one when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    /// Address families to route (default: IPv4 and IPv6)
    #[serde(default = "default_families")]
    pub families: Vec<AddressFamily>,

    /// Destination prefixes to route into the interface
    #[serde(default)]
    pub routes: Vec<RoutePrefix>,
}

fn default_families() -> Vec<AddressFamily> {
    vec![AddressFamily::Ipv4, AddressFamily::Ipv6]
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            interface: None,
            families: default_families(),
            routes: Vec::new(),
        }
    }
}

impl TunnelConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: TunnelConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.interface {
            validate_name(name)?;
        }

        if self.families.is_empty() {
            anyhow::bail!("At least one address family must be enabled");
        }

        if self.families.contains(&AddressFamily::Unrecognized) {
            anyhow::bail!("Only ipv4 and ipv6 can be enabled");
        }

        Ok(())
    }

    pub fn family_enabled(&self, family: AddressFamily) -> bool {
        self.families.contains(&family)
    }

    /// Routes whose family is enabled.
    pub fn enabled_routes(&self) -> impl Iterator<Item = &RoutePrefix> {
        self.routes
            .iter()
            .filter(move |r| self.family_enabled(r.family()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config: TunnelConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TunnelConfig::default());
        assert!(config.family_enabled(AddressFamily::Ipv4));
        assert!(config.family_enabled(AddressFamily::Ipv6));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse() {
        let config: TunnelConfig = serde_json::from_str(
            r#"{
                "interface": "tun7",
                "families": ["ipv4"],
                "routes": ["203.0.113.0/24", "2001:db8::/32", "198.51.100.7"]
            }"#,
        )
        .unwrap();

        assert_eq!(config.interface.as_deref(), Some("tun7"));
        assert_eq!(config.routes.len(), 3);
        assert!(config.routes[2].is_host());

        let enabled: Vec<String> = config.enabled_routes().map(|r| r.to_string()).collect();
        assert_eq!(enabled, vec!["203.0.113.0/24", "198.51.100.7/32"]);
    }

    #[test]
    fn test_bad_route_rejected() {
        let res: std::result::Result<TunnelConfig, _> =
            serde_json::from_str(r#"{"routes": ["10.0.0.0/40"]}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = TunnelConfig::default();
        config.interface = Some("this-name-is-too-long".into());
        assert!(config.validate().is_err());

        config.interface = None;
        config.families.clear();
        assert!(config.validate().is_err());

        config.families = vec![AddressFamily::Unrecognized];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() -> Result<()> {
        let config = TunnelConfig {
            interface: Some("tun3".into()),
            families: vec![AddressFamily::Ipv6],
            routes: vec!["2001:db8:1::/64".parse()?],
        };

        let temp_file = NamedTempFile::new()?;
        config.to_file(temp_file.path())?;

        let loaded_config = TunnelConfig::from_file(temp_file.path())?;
        assert_eq!(config, loaded_config);

        Ok(())
    }
}
