//! Configuration types for the mock service host.

mod listen;
mod protocol;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use listen::{AdminConfig, ListenConfig, TlsConfig};
pub use protocol::Protocol;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Mock endpoints, one per port
    #[serde(default = "listen::default_listeners")]
    pub listeners: Vec<ListenConfig>,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub specs: SpecConfig,
    /// DELETE removes a resource together with its children instead of
    /// rejecting it
    #[serde(default)]
    pub cascade_enabled: bool,
    #[serde(default)]
    pub responses: ResponseConfig,
}

/// Where API specifications are read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpecConfig {
    #[serde(default = "default_spec_directory")]
    pub directory: PathBuf,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            directory: default_spec_directory(),
        }
    }
}

fn default_spec_directory() -> PathBuf {
    PathBuf::from("./specs")
}

/// Response selection settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponseConfig {
    /// Example name to prefer when an operation has several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_example: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listeners: listen::default_listeners(),
            admin: AdminConfig::default(),
            specs: SpecConfig::default(),
            cascade_enabled: false,
            responses: ResponseConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listeners.is_empty() {
            anyhow::bail!("At least one listener must be configured");
        }

        let mut ports = HashSet::new();
        for listener in &self.listeners {
            if listener.protocol == Protocol::Https && listener.tls.is_none() {
                anyhow::bail!(
                    "TLS configuration is required for https listener on port {}. \
                     Please provide 'tls.cert_path' and 'tls.key_path'",
                    listener.port
                );
            }
            if listener.port != 0 && !ports.insert(listener.port) {
                anyhow::bail!("Port {} is configured more than once", listener.port);
            }
        }

        if self.admin.enabled && self.admin.port != 0 && ports.contains(&self.admin.port) {
            anyhow::bail!(
                "Admin port {} collides with a mock listener",
                self.admin.port
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.listeners.len(), 3);
        assert!(config.listeners.iter().any(|l| l.profile.stateful));
        assert!(config.listeners.iter().any(|l| l.profile.always_error));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
listeners:
  - port: 9000
    profile:
      stateful: true
  - port: 9001
    protocol: https
    tls:
      cert_path: /tmp/cert.pem
      key_path: /tmp/key.pem
    profile:
      alwaysError: true
specs:
  directory: /var/specs
cascade_enabled: true
responses:
  preferred_example: Create foo
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.listeners[0].host, "0.0.0.0");
        assert!(config.listeners[0].profile.stateful);
        assert!(config.listeners[1].profile.always_error);
        assert_eq!(config.specs.directory, PathBuf::from("/var/specs"));
        assert!(config.cascade_enabled);
        assert_eq!(config.admin.port, 2525);
        assert_eq!(
            config.responses.preferred_example.as_deref(),
            Some("Create foo")
        );
    }

    #[test]
    fn test_https_requires_tls() {
        let yaml = "listeners:\n  - port: 9000\n    protocol: https\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let yaml = "listeners:\n  - port: 9000\n  - port: 9000\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = "listeners:\n  - port: 2525\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "listeners:\n  - port: 9100\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.listeners.len(), 1);
        assert_eq!(config.listeners[0].port, 9100);
    }
}
