//! Listener, TLS and admin API configuration.

use super::protocol::Protocol;
use crate::models::TestProfile;
use serde::{Deserialize, Serialize};

/// TLS configuration for HTTPS listener
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to TLS certificate file (PEM format)
    pub cert_path: String,
    /// Path to TLS private key file (PEM format)
    pub key_path: String,
}

/// One mock endpoint. Every request it receives runs under `profile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Protocol for listener (http or https)
    #[serde(default)]
    pub protocol: Protocol,
    /// TLS configuration (required when protocol is https)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    #[serde(default)]
    pub profile: TestProfile,
}

impl ListenConfig {
    pub fn http(port: u16, profile: TestProfile) -> Self {
        Self {
            host: default_host(),
            port,
            protocol: Protocol::Http,
            tls: None,
            profile,
        }
    }
}

/// Admin API (health, metrics, resource pool control)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_admin_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_admin_port() -> u16 {
    2525
}

fn default_true() -> bool {
    true
}

/// Stateless, stateful and always-error endpoints
pub(crate) fn default_listeners() -> Vec<ListenConfig> {
    vec![
        ListenConfig::http(8441, TestProfile::default()),
        ListenConfig::http(8443, TestProfile::STATEFUL),
        ListenConfig::http(8444, TestProfile::ALWAYS_ERROR),
    ]
}
