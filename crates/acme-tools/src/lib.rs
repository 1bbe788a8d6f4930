//! acme-tools: ACME DNS-01 client
//!
//! Obtains certificates from an ACME CA (Let's Encrypt by default) by
//! publishing `_acme-challenge` TXT records through a DNS provider API.
//!
//! # Architecture
//!
//! - [`AccountManager`] - Create, import and export ACME accounts
//! - [`Dns01Challenge`] - Order, challenge, finalize flow for a set of domains
//! - [`dns`] - DNS providers, resolver, propagation checks and temporary records
//! - [`keys`] - Certificate key and CSR generation
//! - [`api`] - High-level entry points used by the CLI
//!
//! # Challenge Flow
//!
//! 1. [`Dns01Challenge`] creates a new order for the requested domains
//! 2. For each pending authorization, the DNS-01 challenge value is computed
//! 3. [`dns::Dns01ChallengeManager`] creates the TXT records and waits for propagation
//! 4. The challenges are marked ready and the CA validates them
//! 5. The order is finalized with a fresh key and CSR, and the chain is downloaded
//! 6. TXT records are removed whatever the outcome
//!
//! # Example
//!
//! ```no_run
//! use acme_tools::api::{create_account_file, request_certificate, RequestOptions};
//! use acme_tools::LETSENCRYPT_STAGING;
//!
//! # async fn run() -> Result<(), acme_tools::AcmeError> {
//! create_account_file("./account.json", "someone@example.com", LETSENCRYPT_STAGING).await?;
//!
//! let issued = request_certificate(
//!     &["somedomain.example.com".to_string()],
//!     "./account.json",
//!     RequestOptions::default(),
//! )
//! .await?;
//! println!("{}", issued.certificate_chain_pem);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod api;
mod challenge;
pub mod dns;
mod error;
pub mod keys;
pub mod logging;
pub mod storage;
pub mod types;

pub use account::AccountManager;
pub use acme_tools_config::{KeyType, LETSENCRYPT_PRODUCTION, LETSENCRYPT_STAGING};
pub use challenge::{Dns01Challenge, IssuedCertificate};
pub use error::{AcmeError, StorageError};
pub use types::{Record, RecordOptions, RecordType};

/// Version of the acme-tools crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(VERSION.split('.').count(), 3);
    }
}
