//! DNS propagation checking for DNS-01 challenges
//!
//! Verifies that TXT records are visible through DNS before the ACME server
//! is asked to validate them.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use acme_tools_config::PropagationSettings;

use super::provider::{DnsProviderError, DnsResult};
use super::resolver::{HickoryResolver, Resolver};
use crate::types::Record;

/// Configuration for propagation checking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationConfig {
    /// Delay before first check
    pub initial_delay: Duration,
    /// Interval between checks
    pub check_interval: Duration,
    /// Maximum time to wait for all records
    pub timeout: Duration,
    /// Nameservers to query (empty = defaults)
    pub nameservers: Vec<IpAddr>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            check_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(120),
            nameservers: Vec::new(),
        }
    }
}

impl From<&PropagationSettings> for PropagationConfig {
    fn from(settings: &PropagationSettings) -> Self {
        Self {
            initial_delay: Duration::from_secs(settings.initial_delay_secs),
            check_interval: Duration::from_secs(settings.check_interval_secs),
            timeout: Duration::from_secs(settings.timeout_secs),
            nameservers: settings.nameservers.clone(),
        }
    }
}

/// DNS propagation checker
#[derive(Debug, Clone)]
pub struct PropagationChecker {
    config: PropagationConfig,
    resolver: Arc<dyn Resolver>,
}

impl PropagationChecker {
    /// Create a checker querying through a [`HickoryResolver`]
    pub fn new(config: PropagationConfig) -> Self {
        let resolver = Arc::new(HickoryResolver::new(&config.nameservers));
        Self { config, resolver }
    }

    /// Create a checker querying through the given resolver
    pub fn with_resolver(config: PropagationConfig, resolver: Arc<dyn Resolver>) -> Self {
        Self { config, resolver }
    }

    /// Wait until every record's data is visible through DNS
    ///
    /// All records share a single deadline. Lookup errors are logged and
    /// retried until the deadline passes.
    pub async fn wait_for_records(&self, records: &[Record]) -> DnsResult<()> {
        let start = Instant::now();
        let deadline = start + self.config.timeout;

        debug!(
            records = records.len(),
            timeout_secs = self.config.timeout.as_secs(),
            "Waiting for DNS propagation"
        );

        if !self.config.initial_delay.is_zero() {
            tokio::time::sleep(self.config.initial_delay).await;
        }

        for record in records {
            loop {
                match self.check_record(record).await {
                    Ok(true) => {
                        info!(
                            record = %record.fqdn,
                            elapsed_secs = start.elapsed().as_secs(),
                            "DNS propagation confirmed"
                        );
                        break;
                    }
                    Ok(false) => {
                        trace!(record = %record.fqdn, "Record not yet propagated");
                    }
                    Err(e) => {
                        warn!(record = %record.fqdn, error = %e, "DNS lookup error");
                    }
                }

                if Instant::now() + self.config.check_interval > deadline {
                    return Err(DnsProviderError::PropagationTimeout {
                        record: record.fqdn.clone(),
                        elapsed_secs: start.elapsed().as_secs(),
                    });
                }

                tokio::time::sleep(self.config.check_interval).await;
            }
        }

        Ok(())
    }

    /// Check whether a record's data is currently visible
    pub async fn check_record(&self, record: &Record) -> DnsResult<bool> {
        let values = self.resolver.resolve(&record.fqdn, record.record_type).await?;

        trace!(
            record = %record.fqdn,
            found = ?values,
            expected = %record.data,
            "Checking record values"
        );

        Ok(values.iter().any(|value| *value == record.data))
    }

    /// Get the configuration
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::resolver::tests::MockResolver;
    use crate::types::RecordType;

    fn txt_record(fqdn: &str, data: &str) -> Record {
        Record {
            domain: "example.com".to_string(),
            record_type: RecordType::Txt,
            fqdn: fqdn.to_string(),
            name: "_acme-challenge".to_string(),
            data: data.to_string(),
            ttl: Some(30),
            resource_id: Some("1".to_string()),
        }
    }

    #[test]
    fn test_default_config() {
        let config = PropagationConfig::default();
        assert_eq!(config.initial_delay, Duration::ZERO);
        assert_eq!(config.check_interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.nameservers.is_empty());
    }

    #[test]
    fn test_config_from_settings() {
        let settings = PropagationSettings {
            initial_delay_secs: 10,
            check_interval_secs: 5,
            timeout_secs: 60,
            nameservers: vec!["1.1.1.1".parse().unwrap()],
        };
        let config = PropagationConfig::from(&settings);
        assert_eq!(config.initial_delay, Duration::from_secs(10));
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.nameservers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_until_visible() {
        let resolver = Arc::new(MockResolver::new().with_delay(3));
        resolver.insert("_acme-challenge.example.com", RecordType::Txt, "token-a");
        let checker =
            PropagationChecker::with_resolver(PropagationConfig::default(), resolver.clone());

        let record = txt_record("_acme-challenge.example.com", "token-a");
        checker.wait_for_records(&[record]).await.unwrap();

        assert_eq!(resolver.query_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_value_never_appears() {
        let resolver = Arc::new(MockResolver::new());
        resolver.insert("_acme-challenge.example.com", RecordType::Txt, "other-value");
        let config = PropagationConfig {
            timeout: Duration::from_secs(10),
            ..Default::default()
        };
        let checker = PropagationChecker::with_resolver(config, resolver.clone());

        let record = txt_record("_acme-challenge.example.com", "token-a");
        let err = checker.wait_for_records(&[record]).await.unwrap_err();

        assert!(matches!(err, DnsProviderError::PropagationTimeout { .. }));
        assert!(resolver.query_count() >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_matches_among_multiple_values() {
        let resolver = Arc::new(MockResolver::new());
        resolver.insert("_acme-challenge.example.com", RecordType::Txt, "wildcard-token");
        resolver.insert("_acme-challenge.example.com", RecordType::Txt, "apex-token");
        let checker = PropagationChecker::with_resolver(PropagationConfig::default(), resolver);

        let records = vec![
            txt_record("_acme-challenge.example.com", "apex-token"),
            txt_record("_acme-challenge.example.com", "wildcard-token"),
        ];
        checker.wait_for_records(&records).await.unwrap();
    }
}
