//! High-level entry points
//!
//! [`create_account_file`] registers an account once; [`request_certificate`]
//! reuses that account file for every certificate request.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use acme_tools_config::{Config, DnsProviderConfig};

use crate::account::AccountManager;
use crate::challenge::{Dns01Challenge, IssuedCertificate};
use crate::dns::{
    create_provider, Dns01ChallengeManager, DnsProvider, PropagationChecker, PropagationConfig,
    Resolver,
};
use crate::error::AcmeError;
use crate::KeyType;

/// Default bound on the ACME side of a request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Options of a certificate request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// DNS provider; `None` selects DigitalOcean with a token from the environment
    pub provider: Option<Arc<dyn DnsProvider>>,
    /// Resolver for propagation checks; `None` queries `propagation.nameservers`
    pub resolver: Option<Arc<dyn Resolver>>,
    /// Propagation polling settings
    pub propagation: PropagationConfig,
    /// Certificate key type
    pub key_type: KeyType,
    /// Bound on order validation and finalization
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            provider: None,
            resolver: None,
            propagation: PropagationConfig::default(),
            key_type: KeyType::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RequestOptions {
    /// Build options from a loaded configuration, creating its DNS provider
    pub fn from_config(config: &Config) -> Result<Self, AcmeError> {
        Ok(Self {
            provider: Some(create_provider(&config.dns_provider)?),
            resolver: None,
            propagation: PropagationConfig::from(&config.propagation),
            key_type: config.certificate.key_type,
            timeout: Duration::from_secs(config.certificate.timeout_secs),
        })
    }

    pub fn with_provider(mut self, provider: Arc<dyn DnsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn challenge_manager(&self) -> Result<Dns01ChallengeManager, AcmeError> {
        let provider = match &self.provider {
            Some(provider) => provider.clone(),
            None => create_provider(&DnsProviderConfig::default())?,
        };

        let checker = match &self.resolver {
            Some(resolver) => {
                PropagationChecker::with_resolver(self.propagation.clone(), resolver.clone())
            }
            None => PropagationChecker::new(self.propagation.clone()),
        };

        Ok(Dns01ChallengeManager::new(provider, checker))
    }
}

/// Register a new account and write it to `path`
///
/// Missing parent directories are created. The file is readable only by its
/// owner.
pub async fn create_account_file(
    path: impl AsRef<Path>,
    email: &str,
    directory: &str,
) -> Result<(), AcmeError> {
    let manager = AccountManager::generate_new_account(email, directory).await?;
    manager.export_to_file(path, true)
}

/// Request a certificate for `domains` using a stored account
pub async fn request_certificate(
    domains: &[String],
    account_file: impl AsRef<Path>,
    options: RequestOptions,
) -> Result<IssuedCertificate, AcmeError> {
    let manager = AccountManager::import_from_file(account_file).await?;
    let dns = options.challenge_manager()?;

    info!(
        domains = ?domains,
        provider = dns.provider_name(),
        directory = %manager.directory(),
        "Requesting certificate"
    );

    let deadline = tokio::time::Instant::now() + options.timeout;
    Dns01Challenge::new(domains.to_vec(), &manager, dns)
        .with_key_type(options.key_type)
        .run(deadline)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::provider::tests::MockDnsProvider;
    use crate::error::StorageError;
    use tempfile::TempDir;

    #[test]
    fn test_default_options() {
        let options = RequestOptions::default();
        assert!(options.provider.is_none());
        assert!(options.resolver.is_none());
        assert_eq!(options.key_type, KeyType::Rsa2048);
        assert_eq!(options.timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_builder_methods() {
        let options = RequestOptions::default()
            .with_provider(Arc::new(MockDnsProvider::new()))
            .with_key_type(KeyType::Ec384)
            .with_timeout(Duration::from_secs(30));

        assert_eq!(options.key_type, KeyType::Ec384);
        assert_eq!(options.timeout, Duration::from_secs(30));
        let dns = options.challenge_manager().unwrap();
        assert_eq!(dns.provider_name(), "mock");
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default_embedded().unwrap();
        config.dns_provider.token = Some("inline-token".to_string());
        config.certificate.key_type = KeyType::Ec256;
        config.certificate.timeout_secs = 300;

        let options = RequestOptions::from_config(&config).unwrap();
        assert_eq!(options.key_type, KeyType::Ec256);
        assert_eq!(options.timeout, Duration::from_secs(300));
        assert_eq!(options.provider.unwrap().name(), "digitalocean");
    }

    #[tokio::test]
    async fn test_request_with_missing_account_file() {
        let dir = TempDir::new().unwrap();
        let options = RequestOptions::default().with_provider(Arc::new(MockDnsProvider::new()));

        let result = request_certificate(
            &["example.com".to_string()],
            dir.path().join("account.json"),
            options,
        )
        .await;

        assert!(matches!(
            result,
            Err(AcmeError::Storage(StorageError::NotFound { .. }))
        ));
    }
}
