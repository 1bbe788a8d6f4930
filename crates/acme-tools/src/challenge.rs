//! DNS-01 certificate issuance flow
//!
//! Runs one order from creation to certificate download. TXT records
//! published for the order are removed whatever the outcome.

use std::time::Duration;

use chrono::{DateTime, Utc};
use instant_acme::{
    AuthorizationStatus, ChallengeType, Identifier, NewOrder, Order, OrderStatus,
};
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use acme_tools_config::validation::validate_domain_name;

use crate::account::AccountManager;
use crate::dns::{create_challenge_info, Dns01ChallengeInfo, Dns01ChallengeManager, DnsProviderError};
use crate::error::AcmeError;
use crate::keys::{create_csr, generate_private_key, parse_certificate_expiry};
use crate::KeyType;

/// Interval between order status checks
const ORDER_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A certificate issued by the ACME server
#[derive(Clone)]
pub struct IssuedCertificate {
    /// PEM-encoded certificate private key
    pub private_key_pem: String,
    /// PEM-encoded certificate chain, leaf first
    pub certificate_chain_pem: String,
    /// Expiry of the leaf certificate
    pub not_after: DateTime<Utc>,
}

impl std::fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("not_after", &self.not_after)
            .finish_non_exhaustive()
    }
}

/// DNS-01 challenge for a set of domains
///
/// # Example
///
/// ```no_run
/// # use std::time::Duration;
/// # use acme_tools::{AccountManager, Dns01Challenge, KeyType};
/// # use acme_tools::dns::{create_provider, Dns01ChallengeManager, PropagationConfig};
/// # async fn run(manager: &AccountManager) -> Result<(), Box<dyn std::error::Error>> {
/// let provider = create_provider(&Default::default())?;
/// let dns = Dns01ChallengeManager::with_config(provider, PropagationConfig::default());
///
/// let issued = Dns01Challenge::new(vec!["example.com".to_string()], manager, dns)
///     .with_key_type(KeyType::Ec256)
///     .run(tokio::time::Instant::now() + Duration::from_secs(120))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Dns01Challenge<'a> {
    domains: Vec<String>,
    manager: &'a AccountManager,
    dns: Dns01ChallengeManager,
    key_type: KeyType,
}

impl<'a> Dns01Challenge<'a> {
    /// Create a challenge issuing a certificate with the default key type
    pub fn new(domains: Vec<String>, manager: &'a AccountManager, dns: Dns01ChallengeManager) -> Self {
        Self {
            domains,
            manager,
            dns,
            key_type: KeyType::default(),
        }
    }

    /// Set the certificate key type
    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    /// Domains the certificate is requested for
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Run the order to completion
    ///
    /// Every ACME wait is bounded by `deadline`; DNS propagation is bounded by
    /// the propagation configuration of the challenge manager.
    pub async fn run(&self, deadline: Instant) -> Result<IssuedCertificate, AcmeError> {
        self.validate_domains()?;

        let key = generate_private_key(self.key_type)?;
        let csr = create_csr(&key, &self.domains)?;

        let account = self.manager.account()?;
        let identifiers: Vec<Identifier> = self
            .domains
            .iter()
            .map(|d| Identifier::Dns(d.clone()))
            .collect();

        info!(domains = ?self.domains, key_type = %self.key_type, "Creating certificate order");

        let mut order = account
            .new_order(&NewOrder::new(&identifiers))
            .await
            .map_err(|e| AcmeError::OrderCreation(e.to_string()))?;

        let challenges = self.collect_challenges(&mut order).await?;
        debug!(challenges = challenges.len(), "Extracted DNS-01 challenges");

        let records = self.dns.provision(&challenges).await.map_err(dns_error)?;

        let result = async {
            self.set_challenges_ready(&mut order).await?;
            self.wait_for_order_ready(&mut order, deadline).await?;
            self.finalize(&mut order, &csr, deadline).await
        }
        .await;

        self.dns.cleanup_all(&records).await;

        let certificate_chain_pem = result?;
        let not_after = parse_certificate_expiry(&certificate_chain_pem)?;

        info!(
            domains = ?self.domains,
            expires = %not_after,
            "Certificate issued successfully"
        );

        Ok(IssuedCertificate {
            private_key_pem: key.serialize_pem(),
            certificate_chain_pem,
            not_after,
        })
    }

    fn validate_domains(&self) -> Result<(), AcmeError> {
        if self.domains.is_empty() {
            return Err(AcmeError::InvalidOptions(
                "at least one domain is required".to_string(),
            ));
        }
        for domain in &self.domains {
            validate_domain_name(domain).map_err(AcmeError::InvalidOptions)?;
        }
        Ok(())
    }

    /// DNS-01 challenge of every authorization that is not valid yet
    async fn collect_challenges(
        &self,
        order: &mut Order,
    ) -> Result<Vec<Dns01ChallengeInfo>, AcmeError> {
        let mut authorizations = order.authorizations();
        let mut challenges = Vec::new();

        while let Some(result) = authorizations.next().await {
            let mut authz = result.map_err(|e| {
                AcmeError::OrderCreation(format!("Failed to get authorization: {}", e))
            })?;

            let identifier = authz.identifier();
            let domain = match &identifier.identifier {
                Identifier::Dns(domain) => domain.clone(),
                _ => continue,
            };

            debug!(domain = %domain, status = ?authz.status, "Processing DNS-01 authorization");

            if authz.status == AuthorizationStatus::Valid {
                debug!(domain = %domain, "Authorization already valid");
                continue;
            }

            let dns01_challenge = authz
                .challenge(ChallengeType::Dns01)
                .ok_or_else(|| AcmeError::NoDns01Challenge(domain.clone()))?;

            let key_authorization = dns01_challenge.key_authorization();
            challenges.push(create_challenge_info(
                &domain,
                key_authorization.as_str(),
                &dns01_challenge.url,
            ));
        }

        Ok(challenges)
    }

    /// Tell the ACME server every pending DNS-01 challenge can be validated
    async fn set_challenges_ready(&self, order: &mut Order) -> Result<(), AcmeError> {
        let mut authorizations = order.authorizations();

        while let Some(result) = authorizations.next().await {
            let mut authz = result.map_err(|e| AcmeError::ChallengeValidation {
                domain: self.domains.join(", "),
                message: format!("Failed to get authorization: {}", e),
            })?;

            if authz.status == AuthorizationStatus::Valid {
                continue;
            }

            let domain = match &authz.identifier().identifier {
                Identifier::Dns(domain) => domain.clone(),
                _ => continue,
            };

            let mut challenge = authz
                .challenge(ChallengeType::Dns01)
                .ok_or_else(|| AcmeError::NoDns01Challenge(domain.clone()))?;

            debug!(domain = %domain, url = %challenge.url, "Setting challenge ready");
            challenge
                .set_ready()
                .await
                .map_err(|e| AcmeError::ChallengeValidation {
                    domain,
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }

    /// Poll the order until the CA has validated every challenge
    async fn wait_for_order_ready(
        &self,
        order: &mut Order,
        deadline: Instant,
    ) -> Result<(), AcmeError> {
        loop {
            let state = order
                .refresh()
                .await
                .map_err(|e| AcmeError::OrderCreation(format!("Failed to refresh order: {}", e)))?;

            match state.status {
                OrderStatus::Ready => {
                    info!("Order is ready for finalization");
                    return Ok(());
                }
                OrderStatus::Valid => {
                    info!("Order is already valid (certificate issued)");
                    return Ok(());
                }
                OrderStatus::Invalid => {
                    error!(domains = ?self.domains, "Order became invalid");
                    return Err(AcmeError::ChallengeValidation {
                        domain: self.domains.join(", "),
                        message: "Order became invalid".to_string(),
                    });
                }
                OrderStatus::Pending | OrderStatus::Processing => {
                    if Instant::now() + ORDER_POLL_INTERVAL > deadline {
                        return Err(AcmeError::Timeout(
                            "Timed out waiting for order to become ready".to_string(),
                        ));
                    }
                    trace!(status = ?state.status, "Order not ready yet, waiting...");
                    tokio::time::sleep(ORDER_POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Submit the CSR and download the certificate chain
    async fn finalize(
        &self,
        order: &mut Order,
        csr: &[u8],
        deadline: Instant,
    ) -> Result<String, AcmeError> {
        info!("Finalizing certificate order");

        order
            .finalize_csr(csr)
            .await
            .map_err(|e| AcmeError::Finalization(format!("Failed to finalize order: {}", e)))?;

        loop {
            let state = order
                .refresh()
                .await
                .map_err(|e| AcmeError::Finalization(format!("Failed to refresh order: {}", e)))?;

            match state.status {
                OrderStatus::Valid => {
                    let chain = order.certificate().await.map_err(|e| {
                        AcmeError::Finalization(format!("Failed to get certificate: {}", e))
                    })?;
                    return chain.ok_or_else(|| {
                        AcmeError::Finalization("No certificate in response".to_string())
                    });
                }
                OrderStatus::Invalid => {
                    return Err(AcmeError::Finalization("Order became invalid".to_string()));
                }
                _ => {
                    if Instant::now() + ORDER_POLL_INTERVAL > deadline {
                        return Err(AcmeError::Timeout(
                            "Timed out waiting for certificate".to_string(),
                        ));
                    }
                    tokio::time::sleep(ORDER_POLL_INTERVAL).await;
                }
            }
        }
    }
}

/// Surface propagation timeouts as their own ACME error
fn dns_error(e: DnsProviderError) -> AcmeError {
    match e {
        DnsProviderError::PropagationTimeout {
            record,
            elapsed_secs,
        } => AcmeError::PropagationTimeout {
            record,
            elapsed: Duration::from_secs(elapsed_secs),
        },
        other => AcmeError::DnsProvider(other),
    }
}
