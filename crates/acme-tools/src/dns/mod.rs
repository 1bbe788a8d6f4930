//! DNS-01 challenge support
//!
//! # Architecture
//!
//! - [`DnsProvider`] - Trait for DNS provider implementations
//! - [`Resolver`] - Trait for DNS resolution, implemented by [`HickoryResolver`]
//! - [`Dns01ChallengeManager`] - Creates, propagates and removes challenge records
//! - [`PropagationChecker`] - Verifies DNS propagation before validation
//! - [`CredentialLoader`] - Loading of provider API tokens
//!
//! # Providers
//!
//! - [`DigitalOceanProvider`] - DigitalOcean Domains API
//! - [`WebhookProvider`] - Generic webhook for custom DNS systems

pub mod challenge;
mod credentials;
mod propagation;
pub(crate) mod provider;
mod providers;
pub(crate) mod resolver;

pub use challenge::{create_challenge_info, Dns01ChallengeInfo, Dns01ChallengeManager};
pub use credentials::{
    CredentialLoader, DO_DEFAULT_TOKEN_FILE, DO_TOKEN_ENV_VAR, DO_TOKEN_FILE_ENV_VAR,
};
pub use propagation::{PropagationChecker, PropagationConfig};
pub use provider::{
    challenge_record_fqdn, get_domain, normalize_domain, relative_record_name, DnsProvider,
    DnsProviderError, DnsResult, ACME_CHALLENGE_RECORD, CHALLENGE_TTL,
};
pub use providers::{create_provider, DigitalOceanProvider, WebhookProvider};
pub use resolver::{HickoryResolver, Resolver, DEFAULT_NAMESERVERS};
