//! Configuration module for acme-tools
//!
//! This crate provides configuration parsing and validation for the
//! acme-tools DNS-01 client.
//!
//! # Module Organization
//!
//! - [`account`]: ACME account settings and CA directory URLs
//! - [`certificate`]: Certificate request settings and key types
//! - [`dns`]: DNS provider and propagation settings
//! - [`validation`]: Configuration validation functions
//! - [`defaults`]: Default embedded configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

// ============================================================================
// Module Declarations
// ============================================================================

pub mod account;
pub mod certificate;
mod defaults;
pub mod dns;
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

pub use account::{AccountSettings, LETSENCRYPT_PRODUCTION, LETSENCRYPT_STAGING};
pub use certificate::{CertificateSettings, KeyType};
pub use defaults::DEFAULT_CONFIG_TOML;
pub use dns::{DnsProviderConfig, DnsProviderType, PropagationSettings};

// ============================================================================
// Main Configuration Structure
// ============================================================================

/// Main configuration structure for acme-tools
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
#[validate(schema(function = "validation::validate_config_semantics"))]
pub struct Config {
    /// ACME account settings
    #[serde(default)]
    #[validate(nested)]
    pub account: AccountSettings,

    /// Certificate request settings
    #[serde(default)]
    #[validate(nested)]
    pub certificate: CertificateSettings,

    /// DNS provider used to publish challenge records
    #[serde(default)]
    pub dns_provider: DnsProviderConfig,

    /// DNS propagation checking
    #[serde(default)]
    pub propagation: PropagationSettings,
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration from a file
    ///
    /// The format is picked from the extension: `.json` is parsed as JSON,
    /// `.toml` or no extension as TOML, and any other extension is rejected.
    /// The loaded configuration is validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("toml");

        let config = match extension {
            "json" => Self::from_json(&content)?,
            "toml" => Self::from_toml(&content)?,
            _ => return Err(anyhow::anyhow!("Unsupported config format: {}", extension)),
        };

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from TOML
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validated()
    }

    /// Parse and validate configuration from JSON
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Failed to parse JSON config")?;
        config.validated()
    }

    /// Load the default embedded configuration
    pub fn default_embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CONFIG_TOML)
    }

    fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n{}", e))?;
        Ok(self)
    }
}

/// Expand a leading `~` to the current user's home directory
///
/// Paths without a leading `~`, or when no home directory can be
/// determined, are returned unchanged.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
