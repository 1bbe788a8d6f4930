//! DNS provider trait for DNS-01 challenges
//!
//! Defines the interface that all DNS providers must implement, the error
//! type they report and the domain name helpers they share.

use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

use crate::types::{Record, RecordOptions};

/// Result type for DNS operations
pub type DnsResult<T> = Result<T, DnsProviderError>;

/// Errors that can occur during DNS provider and resolver operations
#[derive(Debug, Error)]
pub enum DnsProviderError {
    /// The domain name cannot be used
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    /// The record type cannot be queried or managed
    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    /// The record lacks information the provider needs
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Provider API returned 404
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// Provider API returned 401 or 403
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Provider API returned 429
    #[error("Rate limited by DNS provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Provider API returned a 5xx status
    #[error("DNS provider server error: {0}")]
    Server(String),

    /// Provider API rejected the request (400, 422, 428)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A record with a different value already exists
    #[error("A {record_type} record for '{fqdn}' already exists with a different value")]
    RecordAlreadyExists { fqdn: String, record_type: String },

    /// API request failed
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// Request timeout
    #[error("Request timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    /// Record did not become visible in time
    #[error("Record '{record}' did not propagate within {elapsed_secs}s")]
    PropagationTimeout { record: String, elapsed_secs: u64 },

    /// DNS lookup failed
    #[error("DNS lookup failed: {0}")]
    Lookup(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Credential loading failed
    #[error("Failed to load credentials: {0}")]
    Credentials(String),
}

impl DnsProviderError {
    /// Whether the failed request may succeed when sent again
    ///
    /// Only server-side failures and timeouts, request or propagation,
    /// qualify. Rate limited requests must wait for the provider's reset time
    /// instead.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DnsProviderError::Server(_)
                | DnsProviderError::Timeout { .. }
                | DnsProviderError::PropagationTimeout { .. }
        )
    }
}

/// Trait for DNS providers that support DNS-01 challenges
///
/// Implementations must be thread-safe and support concurrent operations.
#[async_trait]
pub trait DnsProvider: Send + Sync + Debug {
    /// Returns the provider name (e.g., "digitalocean", "webhook")
    fn name(&self) -> &'static str;

    /// Create a DNS record
    ///
    /// # Implementation Notes
    ///
    /// - When an identical record (same data and TTL) exists, return it
    ///   instead of creating a duplicate
    /// - When a record with a different value exists and `options.append`
    ///   is false, fail with [`DnsProviderError::RecordAlreadyExists`]
    /// - The returned record must carry whatever `delete_record` needs
    async fn create_record(&self, options: &RecordOptions) -> DnsResult<Record>;

    /// Delete a record previously returned by `create_record`
    ///
    /// Should not error if the record no longer exists.
    async fn delete_record(&self, record: &Record) -> DnsResult<()>;
}

/// ACME challenge record name prefix
pub const ACME_CHALLENGE_RECORD: &str = "_acme-challenge";

/// TTL for challenge records (30 seconds)
pub const CHALLENGE_TTL: u32 = 30;

/// Strip a leading wildcard label
///
/// `*.example.com` is validated through `_acme-challenge.example.com`.
pub fn normalize_domain(domain: &str) -> &str {
    domain.strip_prefix("*.").unwrap_or(domain)
}

/// Build the full ACME challenge record name
///
/// For `example.com` and `*.example.com`, returns `_acme-challenge.example.com`
pub fn challenge_record_fqdn(domain: &str) -> String {
    let normalized = normalize_domain(domain);
    format!("{}.{}", ACME_CHALLENGE_RECORD, normalized)
}

/// Get the registrable domain (last two labels) of an FQDN
pub fn get_domain(fqdn: &str) -> DnsResult<String> {
    let fqdn = fqdn.trim_end_matches('.');
    if fqdn.is_empty() {
        return Err(DnsProviderError::InvalidDomainName(
            "Provided fqdn is empty".to_string(),
        ));
    }
    if !fqdn.contains('.') {
        return Err(DnsProviderError::InvalidDomainName(format!(
            "Domain name '{}' must have an extension (.com, .fr, ...)",
            fqdn
        )));
    }

    let labels: Vec<&str> = fqdn.rsplitn(3, '.').take(2).collect();
    Ok(format!("{}.{}", labels[1], labels[0]))
}

/// Record name relative to its zone
///
/// Returns `@` for the zone apex.
pub fn relative_record_name(fqdn: &str, zone: &str) -> String {
    let fqdn = fqdn.trim_end_matches('.');
    if fqdn == zone {
        "@".to_string()
    } else if let Some(stripped) = fqdn.strip_suffix(&format!(".{}", zone)) {
        stripped.to_string()
    } else {
        fqdn.to_string()
    }
}
