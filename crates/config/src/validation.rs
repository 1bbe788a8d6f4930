//! Configuration validation functions
//!
//! Field-level checks are declared with `validator` attributes on the
//! configuration structs. This module holds the semantic checks that span
//! several fields, plus the domain name syntax check shared with the client.

use std::collections::HashSet;
use tracing::trace;

use crate::{Config, DnsProviderType};

// ============================================================================
// Field Validators
// ============================================================================

/// Validate the syntax of a domain name to be certified
///
/// Accepts an optional leading `*.` wildcard label. Every other label must
/// be 1-63 characters of ASCII letters, digits or hyphens, not starting or
/// ending with a hyphen. At least two labels are required.
pub fn validate_domain_name(domain: &str) -> Result<(), String> {
    if domain.is_empty() {
        return Err("domain name is empty".to_string());
    }

    let name = domain.strip_prefix("*.").unwrap_or(domain);
    let name = name.strip_suffix('.').unwrap_or(name);

    if name.len() > 253 {
        return Err(format!("domain name '{}' is longer than 253 characters", domain));
    }

    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() < 2 {
        return Err(format!(
            "domain name '{}' must have an extension (.com, .fr, ...)",
            domain
        ));
    }

    for label in labels {
        if label.is_empty() || label.len() > 63 {
            return Err(format!("domain name '{}' has an invalid label length", domain));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!(
                "label '{}' in '{}' must not start or end with a hyphen",
                label, domain
            ));
        }
        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(format!(
                "label '{}' in '{}' contains invalid characters",
                label, domain
            ));
        }
    }

    Ok(())
}

// ============================================================================
// Semantic Validation
// ============================================================================

/// Semantic validation for the entire configuration
pub fn validate_config_semantics(config: &Config) -> Result<(), validator::ValidationError> {
    trace!(
        domains = config.certificate.domains.len(),
        provider = config.dns_provider.provider.name(),
        "Starting semantic validation"
    );

    let mut errors: Vec<String> = Vec::new();

    validate_domains(config, &mut errors);
    validate_dns_provider(config, &mut errors);
    validate_propagation(config, &mut errors);

    build_validation_result(errors)
}

fn validate_domains(config: &Config, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for domain in &config.certificate.domains {
        if let Err(e) = validate_domain_name(domain) {
            errors.push(format!("certificate: {}", e));
        }
        if !seen.insert(domain.to_ascii_lowercase()) {
            errors.push(format!("certificate: domain '{}' is listed twice", domain));
        }
    }
}

fn validate_dns_provider(config: &Config, errors: &mut Vec<String>) {
    let provider = &config.dns_provider;

    let sources = [
        provider.token.is_some(),
        provider.credentials_file.is_some(),
        provider.credentials_env.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if sources > 1 {
        errors.push(
            "dns-provider: specify only one of 'token', 'credentials-file' or 'credentials-env'"
                .to_string(),
        );
    }

    if provider.api_timeout_secs == 0 {
        errors.push("dns-provider: 'api-timeout-secs' must be at least 1".to_string());
    }

    if let DnsProviderType::Webhook { url, .. } = &provider.provider {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!(
                "dns-provider: webhook url '{}' must start with http:// or https://",
                url
            ));
        }
    }
}

fn validate_propagation(config: &Config, errors: &mut Vec<String>) {
    let propagation = &config.propagation;

    if propagation.check_interval_secs == 0 {
        errors.push("propagation: 'check-interval-secs' must be at least 1".to_string());
    }
    if propagation.timeout_secs < propagation.check_interval_secs {
        errors.push(format!(
            "propagation: 'timeout-secs' ({}) is shorter than 'check-interval-secs' ({})",
            propagation.timeout_secs, propagation.check_interval_secs
        ));
    }
}

// ============================================================================
// Result Building
// ============================================================================

fn build_validation_result(errors: Vec<String>) -> Result<(), validator::ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("config_validation_failed");
        let error_summary = if errors.len() == 1 {
            errors[0].clone()
        } else {
            format!(
                "Configuration has {} issues:\n\n{}",
                errors.len(),
                errors
                    .iter()
                    .enumerate()
                    .map(|(i, e)| format!("{}. {}", i + 1, e))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };
        err.message = Some(std::borrow::Cow::Owned(error_summary));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DnsProviderConfig;

    #[test]
    fn test_validate_domain_name() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("*.example.com").is_ok());
        assert!(validate_domain_name("a-b.sub.example.co.uk").is_ok());
        assert!(validate_domain_name("example.com.").is_ok());

        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("localhost").is_err());
        assert!(validate_domain_name("-bad.example.com").is_err());
        assert!(validate_domain_name("bad..example.com").is_err());
        assert!(validate_domain_name("sp ace.example.com").is_err());
        assert!(validate_domain_name("*.*.example.com").is_err());
    }

    #[test]
    fn test_duplicate_domains_rejected() {
        let mut config = Config::default();
        config.certificate.domains = vec!["example.com".into(), "Example.com".into()];

        let err = validate_config_semantics(&config).unwrap_err();
        assert!(err.message.unwrap().contains("listed twice"));
    }

    #[test]
    fn test_multiple_credential_sources_rejected() {
        let mut config = Config::default();
        config.dns_provider = DnsProviderConfig {
            token: Some("abc".into()),
            credentials_env: Some("DO_TOKEN".into()),
            ..Default::default()
        };

        assert!(validate_config_semantics(&config).is_err());
    }

    #[test]
    fn test_webhook_url_scheme() {
        let mut config = Config::default();
        config.dns_provider.provider = DnsProviderType::Webhook {
            url: "ftp://dns.example.com".into(),
            auth_header: None,
        };

        assert!(validate_config_semantics(&config).is_err());
    }

    #[test]
    fn test_propagation_interval_longer_than_timeout() {
        let mut config = Config::default();
        config.propagation.check_interval_secs = 30;
        config.propagation.timeout_secs = 10;

        let err = validate_config_semantics(&config).unwrap_err();
        assert!(err.message.unwrap().contains("timeout-secs"));
    }

    #[test]
    fn test_multiple_issues_are_numbered() {
        let mut config = Config::default();
        config.certificate.domains = vec!["localhost".into()];
        config.propagation.check_interval_secs = 0;

        let err = validate_config_semantics(&config).unwrap_err();
        let message = err.message.unwrap();
        assert!(message.contains("issues"));
        assert!(message.contains("1. "));
        assert!(message.contains("2. "));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config_semantics(&Config::default()).is_ok());
    }
}
