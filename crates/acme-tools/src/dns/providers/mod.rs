//! DNS provider implementations
//!
//! Available providers:
//! - [`DigitalOceanProvider`] - DigitalOcean Domains API
//! - [`WebhookProvider`] - Generic webhook for custom providers

mod digitalocean;
mod webhook;

pub use digitalocean::DigitalOceanProvider;
pub use webhook::WebhookProvider;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

use acme_tools_config::{DnsProviderConfig, DnsProviderType};

use super::credentials::CredentialLoader;
use super::provider::{DnsProvider, DnsProviderError, DnsResult};

/// Attempts made for requests failing with a retryable error
const MAX_ATTEMPTS: u32 = 3;
/// Pause between attempts
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Create a DNS provider from configuration
pub fn create_provider(config: &DnsProviderConfig) -> DnsResult<Arc<dyn DnsProvider>> {
    let timeout = Duration::from_secs(config.api_timeout_secs);

    match &config.provider {
        DnsProviderType::DigitalOcean => {
            let token = match CredentialLoader::load_configured(config)? {
                Some(token) => token,
                None => CredentialLoader::digitalocean_token(None, None)?,
            };
            Ok(Arc::new(DigitalOceanProvider::new(&token, timeout)?))
        }
        DnsProviderType::Webhook { url, auth_header } => {
            let token = CredentialLoader::load_configured(config)?;
            let provider = WebhookProvider::new(url.clone(), auth_header.clone(), token, timeout)?;
            Ok(Arc::new(provider))
        }
    }
}

/// Map a provider API response status to an error
///
/// Successful responses are returned unchanged.
async fn check_response(response: Response) -> DnsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(DnsProviderError::ResourceNotFound(
            response.url().path().to_string(),
        )),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(DnsProviderError::Unauthorized(format!(
                "HTTP {}. Check the API token",
                status
            )))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get("ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
                .map(|reset| (reset - chrono::Utc::now().timestamp()).max(0) as u64)
                .unwrap_or(0);
            Err(DnsProviderError::RateLimited { retry_after_secs })
        }
        StatusCode::BAD_REQUEST
        | StatusCode::UNPROCESSABLE_ENTITY
        | StatusCode::PRECONDITION_REQUIRED => {
            Err(DnsProviderError::InvalidRequest(error_message(response).await))
        }
        s if s.is_server_error() => Err(DnsProviderError::Server(error_message(response).await)),
        s => Err(DnsProviderError::ApiRequest(format!(
            "HTTP {} - {}",
            s,
            error_message(response).await
        ))),
    }
}

/// Extract the `message` of a JSON error body, or the raw body
async fn error_message(response: Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        })
}

/// Map a transport error
fn request_error(e: reqwest::Error, timeout: Duration, action: &str) -> DnsProviderError {
    if e.is_timeout() {
        DnsProviderError::Timeout {
            elapsed_secs: timeout.as_secs(),
        }
    } else {
        DnsProviderError::ApiRequest(format!("Failed to {}: {}", action, e))
    }
}

/// Run a request, retrying retryable failures
async fn with_retries<T, F, Fut>(action: &str, mut request: F) -> DnsResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DnsResult<T>>,
{
    let mut attempt = 1;
    loop {
        match request().await {
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!(action, attempt, error = %e, "DNS provider request failed, retrying");
                attempt += 1;
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_retries_server_errors() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: DnsResult<u32> = with_retries("test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(DnsProviderError::Server("unavailable".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retries_gives_up() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: DnsResult<()> = with_retries("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DnsProviderError::Server("unavailable".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_with_retries_does_not_retry_client_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: DnsResult<()> = with_retries("test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DnsProviderError::Unauthorized("no".into()))
        })
        .await;

        assert!(matches!(result, Err(DnsProviderError::Unauthorized(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_create_provider_webhook() {
        let config = DnsProviderConfig {
            provider: DnsProviderType::Webhook {
                url: "https://dns.example.com/".to_string(),
                auth_header: None,
            },
            token: Some("secret".to_string()),
            ..Default::default()
        };

        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "webhook");
    }

    #[test]
    fn test_create_provider_digitalocean_inline_token() {
        let config = DnsProviderConfig {
            token: Some("do-token".to_string()),
            ..Default::default()
        };

        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.name(), "digitalocean");
    }
}
