//! DNS provider and propagation settings

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// DNS provider configuration
///
/// ```toml
/// [dns-provider]
/// type = "digitalocean"
/// credentials-file = "/etc/acme-tools/digitalocean.token"
/// api-timeout-secs = 30
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DnsProviderConfig {
    /// Provider type and its type-specific settings
    #[serde(flatten)]
    pub provider: DnsProviderType,

    /// Inline API token
    #[serde(default)]
    pub token: Option<String>,

    /// File holding the API token (plain text or JSON)
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Environment variable holding the API token
    #[serde(default)]
    pub credentials_env: Option<String>,

    /// Timeout for provider API requests
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl Default for DnsProviderConfig {
    fn default() -> Self {
        Self {
            provider: DnsProviderType::DigitalOcean,
            token: None,
            credentials_file: None,
            credentials_env: None,
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

/// Supported DNS providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DnsProviderType {
    /// DigitalOcean Domains API
    #[serde(rename = "digitalocean")]
    DigitalOcean,

    /// Generic HTTP webhook
    Webhook {
        /// Base URL of the webhook API
        url: String,
        /// Header carrying the token (bearer auth when absent)
        #[serde(default, rename = "auth-header")]
        auth_header: Option<String>,
    },
}

impl DnsProviderType {
    pub fn name(&self) -> &'static str {
        match self {
            DnsProviderType::DigitalOcean => "digitalocean",
            DnsProviderType::Webhook { .. } => "webhook",
        }
    }
}

/// DNS propagation checking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PropagationSettings {
    /// Delay before the first lookup
    #[serde(default)]
    pub initial_delay_secs: u64,

    /// Interval between lookups
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Maximum time to wait for all records
    #[serde(default = "default_propagation_timeout_secs")]
    pub timeout_secs: u64,

    /// Nameservers to query (empty = built-in public resolvers)
    #[serde(default)]
    pub nameservers: Vec<IpAddr>,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 0,
            check_interval_secs: default_check_interval_secs(),
            timeout_secs: default_propagation_timeout_secs(),
            nameservers: Vec::new(),
        }
    }
}

fn default_api_timeout_secs() -> u64 {
    30
}

fn default_check_interval_secs() -> u64 {
    2
}

fn default_propagation_timeout_secs() -> u64 {
    120
}
