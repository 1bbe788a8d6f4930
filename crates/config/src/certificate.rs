//! Certificate request settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

/// Private key algorithm for issued certificates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// ECDSA P-256
    #[serde(rename = "EC256")]
    Ec256,
    /// ECDSA P-384
    #[serde(rename = "EC384")]
    Ec384,
    /// RSA 2048 bits
    #[default]
    #[serde(rename = "RSA2048")]
    Rsa2048,
    /// RSA 3072 bits
    #[serde(rename = "RSA3072")]
    Rsa3072,
    /// RSA 4096 bits
    #[serde(rename = "RSA4096")]
    Rsa4096,
}

impl KeyType {
    /// All supported key types
    pub const ALL: [KeyType; 5] = [
        KeyType::Ec256,
        KeyType::Ec384,
        KeyType::Rsa2048,
        KeyType::Rsa3072,
        KeyType::Rsa4096,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ec256 => "EC256",
            KeyType::Ec384 => "EC384",
            KeyType::Rsa2048 => "RSA2048",
            KeyType::Rsa3072 => "RSA3072",
            KeyType::Rsa4096 => "RSA4096",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyType::ALL
            .into_iter()
            .find(|kt| kt.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Unknown key type '{}'. Expected one of: EC256, EC384, RSA2048, RSA3072, RSA4096",
                    s
                )
            })
    }
}

/// Certificate request configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "kebab-case")]
pub struct CertificateSettings {
    /// Domains to include in the certificate (first one is the common name)
    #[serde(default)]
    pub domains: Vec<String>,

    /// Private key algorithm
    #[serde(default)]
    pub key_type: KeyType,

    /// Directory receiving the key and certificate chain
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Overall deadline for validating and finalizing an order
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, message = "certificate timeout-secs must be at least 1"))]
    pub timeout_secs: u64,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            key_type: KeyType::default(),
            output_dir: default_output_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("certs")
}

fn default_timeout_secs() -> u64 {
    120
}
