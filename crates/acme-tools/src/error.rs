//! ACME error types

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::dns::DnsProviderError;

/// Errors that can occur during ACME operations
#[derive(Debug, Error)]
pub enum AcmeError {
    /// No ACME account has been registered or loaded
    #[error("ACME account not initialized - create or import an account first")]
    NoAccount,

    /// Failed to create or load ACME account
    #[error("Failed to create ACME account: {0}")]
    AccountCreation(String),

    /// Account file content is not usable
    #[error("Invalid account file: {0}")]
    InvalidAccountFile(String),

    /// Invalid request options (domains, key type, ...)
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Failed to create certificate order
    #[error("Failed to create certificate order: {0}")]
    OrderCreation(String),

    /// Challenge validation failed
    #[error("Challenge validation failed for domain '{domain}': {message}")]
    ChallengeValidation { domain: String, message: String },

    /// Certificate finalization failed
    #[error("Failed to finalize certificate: {0}")]
    Finalization(String),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The CA refused to deactivate the account
    #[error("Failed to deactivate ACME account: {0}")]
    AccountDeactivation(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// No DNS-01 challenge available for domain
    #[error("ACME server does not offer a DNS-01 challenge for domain '{0}'")]
    NoDns01Challenge(String),

    /// DNS provider operation failed
    #[error("DNS provider error: {0}")]
    DnsProvider(#[from] DnsProviderError),

    /// DNS propagation timeout
    #[error("DNS propagation timeout for record '{record}' after {elapsed:?}")]
    PropagationTimeout { record: String, elapsed: Duration },

    /// Key or CSR generation failed
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// Certificate parsing error
    #[error("Failed to parse certificate: {0}")]
    CertificateParse(String),
}

/// Errors specific to account and certificate file operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to serialize/deserialize data
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Refusing to overwrite an existing file
    #[error("File already exists: {path}")]
    AlreadyExists { path: String },

    /// File not found
    #[error("File not found: {path}")]
    NotFound { path: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AcmeError::NoDns01Challenge("example.com".to_string());
        assert!(err.to_string().contains("DNS-01"));
        assert!(err.to_string().contains("example.com"));

        let err = AcmeError::PropagationTimeout {
            record: "_acme-challenge.example.com".to_string(),
            elapsed: Duration::from_secs(120),
        };
        assert!(err.to_string().contains("_acme-challenge.example.com"));
        assert!(err.to_string().contains("120"));

        let err = AcmeError::AccountDeactivation("account is locked".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to deactivate ACME account: account is locked"
        );
    }

    #[test]
    fn test_storage_error_from_io() {
        let err: AcmeError =
            StorageError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied")).into();
        assert!(matches!(err, AcmeError::Storage(StorageError::Io(_))));
    }

    #[test]
    fn test_dns_error_conversion() {
        let err: AcmeError = DnsProviderError::Unauthorized("bad token".to_string()).into();
        assert!(matches!(err, AcmeError::DnsProvider(_)));
        assert!(err.to_string().contains("bad token"));
    }
}
