//! DNS-01 challenge record management
//!
//! Orchestrates the DNS side of the DNS-01 flow:
//! 1. Create all TXT records via the DNS provider
//! 2. Wait for propagation of every record
//! 3. Cleanup records after validation, or as soon as provisioning fails

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use super::propagation::{PropagationChecker, PropagationConfig};
use super::provider::{challenge_record_fqdn, DnsProvider, DnsResult, CHALLENGE_TTL};
use crate::types::{Record, RecordOptions};

/// Information about a pending DNS-01 challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dns01ChallengeInfo {
    /// Domain this challenge is for (may be a wildcard)
    pub domain: String,
    /// The full record name (e.g., "_acme-challenge.example.com")
    pub record_name: String,
    /// The challenge value to set in the TXT record
    pub record_value: String,
    /// Challenge URL on the ACME server
    pub url: String,
}

/// DNS-01 challenge manager
///
/// Coordinates DNS record creation, propagation checking, and cleanup.
#[derive(Debug, Clone)]
pub struct Dns01ChallengeManager {
    provider: Arc<dyn DnsProvider>,
    propagation_checker: PropagationChecker,
}

impl Dns01ChallengeManager {
    /// Create a manager with an explicit propagation checker
    pub fn new(provider: Arc<dyn DnsProvider>, propagation_checker: PropagationChecker) -> Self {
        Self {
            provider,
            propagation_checker,
        }
    }

    /// Create a manager resolving through the default resolver
    pub fn with_config(provider: Arc<dyn DnsProvider>, config: PropagationConfig) -> Self {
        Self::new(provider, PropagationChecker::new(config))
    }

    /// Compute the DNS-01 challenge value from key authorization
    ///
    /// The DNS-01 challenge value is the base64url-encoded SHA256 digest
    /// of the key authorization.
    pub fn compute_challenge_value(key_authorization: &str) -> String {
        let digest = Sha256::digest(key_authorization.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Publish TXT records and wait until all of them are visible
    ///
    /// Every record is created before propagation is checked. If anything
    /// fails, the records created so far are deleted before returning the
    /// error.
    pub async fn provision(&self, challenges: &[Dns01ChallengeInfo]) -> DnsResult<Vec<Record>> {
        let mut records = Vec::with_capacity(challenges.len());

        for challenge in challenges {
            info!(
                domain = %challenge.domain,
                record = %challenge.record_name,
                provider = %self.provider.name(),
                "Creating DNS-01 challenge record"
            );

            let options =
                RecordOptions::txt(&challenge.record_name, &challenge.record_value, CHALLENGE_TTL);
            match self.provider.create_record(&options).await {
                Ok(record) => {
                    debug!(
                        record = %record.fqdn,
                        resource_id = ?record.resource_id,
                        "DNS record created"
                    );
                    records.push(record);
                }
                Err(e) => {
                    error!(domain = %challenge.domain, error = %e, "Failed to create challenge record");
                    self.cleanup_all(&records).await;
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.propagation_checker.wait_for_records(&records).await {
            self.cleanup_all(&records).await;
            return Err(e);
        }

        info!(records = records.len(), "DNS-01 challenge records propagated");
        Ok(records)
    }

    /// Delete a single challenge record
    pub async fn cleanup(&self, record: &Record) -> DnsResult<()> {
        debug!(record = %record.fqdn, resource_id = ?record.resource_id, "Cleaning up DNS-01 challenge record");

        match self.provider.delete_record(record).await {
            Ok(()) => {
                info!(record = %record.fqdn, "DNS-01 challenge record cleaned up");
                Ok(())
            }
            Err(e) => {
                warn!(
                    record = %record.fqdn,
                    error = %e,
                    "Failed to cleanup DNS-01 challenge record"
                );
                Err(e)
            }
        }
    }

    /// Delete every record, continuing past failures
    pub async fn cleanup_all(&self, records: &[Record]) {
        if records.is_empty() {
            return;
        }
        info!(records = records.len(), "Deleting DNS-01 challenge records");
        for record in records {
            let _ = self.cleanup(record).await;
        }
    }

    /// Get the DNS provider name
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Create DNS-01 challenge info from ACME authorization data
pub fn create_challenge_info(
    domain: &str,
    key_authorization: &str,
    challenge_url: &str,
) -> Dns01ChallengeInfo {
    Dns01ChallengeInfo {
        domain: domain.to_string(),
        record_name: challenge_record_fqdn(domain),
        record_value: Dns01ChallengeManager::compute_challenge_value(key_authorization),
        url: challenge_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::provider::tests::MockDnsProvider;
    use crate::dns::provider::DnsProviderError;
    use crate::dns::resolver::tests::MockResolver;
    use crate::types::RecordType;
    use std::time::Duration;

    fn manager(provider: Arc<MockDnsProvider>, resolver: Arc<MockResolver>) -> Dns01ChallengeManager {
        let config = PropagationConfig {
            timeout: Duration::from_secs(10),
            ..Default::default()
        };
        Dns01ChallengeManager::new(provider, PropagationChecker::with_resolver(config, resolver))
    }

    #[test]
    fn test_compute_challenge_value() {
        // token.thumbprint shaped key authorization
        let value = Dns01ChallengeManager::compute_challenge_value(
            "evaGxfADs6pSRb2LAv9IZf17Dt3juxGJ-PCt92wr-oA.nysa_9aZvAxgHXCXUTQbMLGjbnkBSX_ivRXg6cPtRnA",
        );
        assert_eq!(value.len(), 43);
        assert!(!value.contains('+'));
        assert!(!value.contains('/'));
        assert!(!value.contains('='));

        // SHA-256 of the empty string
        assert_eq!(
            Dns01ChallengeManager::compute_challenge_value(""),
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn test_wildcard_challenge_info() {
        let info = create_challenge_info(
            "*.example.com",
            "token.thumbprint",
            "https://acme.example.com/challenge/456",
        );

        assert_eq!(info.domain, "*.example.com");
        assert_eq!(info.record_name, "_acme-challenge.example.com");
        assert_eq!(info.url, "https://acme.example.com/challenge/456");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provision_creates_all_then_waits() {
        let provider = Arc::new(MockDnsProvider::new());
        let resolver = Arc::new(MockResolver::new().with_delay(1));
        let challenges = vec![
            create_challenge_info("example.com", "a.thumb", "https://ca/1"),
            create_challenge_info("www.example.com", "b.thumb", "https://ca/2"),
        ];
        for c in &challenges {
            resolver.insert(&c.record_name, RecordType::Txt, &c.record_value);
        }

        let manager = manager(provider.clone(), resolver);
        let records = manager.provision(&challenges).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(provider.record_count(), 2);
        assert_eq!(records[0].ttl, Some(CHALLENGE_TTL));

        manager.cleanup_all(&records).await;
        assert_eq!(provider.record_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provision_cleans_up_on_create_failure() {
        let provider = Arc::new(MockDnsProvider::new().with_failure_on_create(2));
        let resolver = Arc::new(MockResolver::new());
        let challenges = vec![
            create_challenge_info("example.com", "a.thumb", "https://ca/1"),
            create_challenge_info("www.example.com", "b.thumb", "https://ca/2"),
        ];

        let result = manager(provider.clone(), resolver).provision(&challenges).await;

        assert!(matches!(result, Err(DnsProviderError::Server(_))));
        assert_eq!(provider.record_count(), 0);
        assert_eq!(provider.deleted.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provision_cleans_up_on_propagation_timeout() {
        let provider = Arc::new(MockDnsProvider::new());
        let resolver = Arc::new(MockResolver::new());
        let challenges = vec![create_challenge_info("example.com", "a.thumb", "https://ca/1")];

        let result = manager(provider.clone(), resolver).provision(&challenges).await;

        assert!(matches!(
            result,
            Err(DnsProviderError::PropagationTimeout { .. })
        ));
        assert_eq!(provider.record_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_all_continues_after_failure() {
        let provider = Arc::new(MockDnsProvider::new().with_failure_on_delete());
        let resolver = Arc::new(MockResolver::new());
        let manager = manager(provider.clone(), resolver);

        let options = RecordOptions::txt("_acme-challenge.example.com", "v", 30);
        let first = provider.create_record(&options).await.unwrap();
        let second = provider.create_record(&options).await.unwrap();

        manager.cleanup_all(&[first, second]).await;
        assert_eq!(provider.record_count(), 2);
        assert_eq!(manager.provider_name(), "mock");
    }
}
