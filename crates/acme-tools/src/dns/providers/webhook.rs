//! Generic webhook DNS provider
//!
//! Allows integration with custom DNS management systems via HTTP webhooks.
//!
//! # Webhook API
//!
//! ## Create Record
//! ```text
//! POST {url}/records
//! Content-Type: application/json
//!
//! {
//!   "fqdn": "_acme-challenge.example.com",
//!   "domain": "example.com",
//!   "name": "_acme-challenge",
//!   "record_type": "TXT",
//!   "record_value": "challenge-value",
//!   "ttl": 30,
//!   "append": true
//! }
//!
//! Response:
//! {
//!   "record_id": "unique-id"
//! }
//! ```
//!
//! A `409 Conflict` response means a different record already exists.
//!
//! ## Delete Record
//! ```text
//! DELETE {url}/records/{record_id}?domain={domain}
//!
//! Response: 200 OK or 204 No Content
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{check_response, request_error, with_retries};
use crate::dns::provider::{
    get_domain, relative_record_name, DnsProvider, DnsProviderError, DnsResult,
};
use crate::types::{Record, RecordOptions};

/// Webhook DNS provider for custom integrations
pub struct WebhookProvider {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
    token: Option<String>,
    timeout: Duration,
}

impl WebhookProvider {
    /// Create a new webhook DNS provider
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for the webhook API
    /// * `auth_header` - Optional custom auth header name (e.g., "X-API-Key")
    /// * `token` - Optional token sent in the auth header, or as a bearer token
    /// * `timeout` - Request timeout
    pub fn new(
        base_url: String,
        auth_header: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> DnsResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            DnsProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        // Remove trailing slash from base URL
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            auth_header,
            token,
            timeout,
        })
    }

    /// Add authentication to a request
    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.auth_header, &self.token) {
            (Some(header), Some(token)) => request.header(header.as_str(), token.as_str()),
            (None, Some(token)) => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn create_record_once(&self, request: &CreateRecordRequest) -> DnsResult<String> {
        let request_builder = self
            .client
            .post(format!("{}/records", self.base_url))
            .json(request);

        let response = self
            .add_auth(request_builder)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout, "call webhook"))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(DnsProviderError::RecordAlreadyExists {
                fqdn: request.fqdn.clone(),
                record_type: request.record_type.clone(),
            });
        }

        let response = check_response(response).await?;
        let body: CreateRecordResponse = response.json().await.map_err(|e| {
            DnsProviderError::ApiRequest(format!("Failed to parse webhook response: {}", e))
        })?;
        Ok(body.record_id)
    }

    async fn delete_record_once(&self, domain: &str, record_id: &str) -> DnsResult<()> {
        let request_builder = self
            .client
            .delete(format!("{}/records/{}", self.base_url, record_id))
            .query(&[("domain", domain)]);

        let response = self
            .add_auth(request_builder)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout, "call webhook"))?;

        // 404 is acceptable - record might already be deleted
        if response.status() == StatusCode::NOT_FOUND {
            debug!(record_id = %record_id, "Record already deleted");
            return Ok(());
        }

        check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for WebhookProvider {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn create_record(&self, options: &RecordOptions) -> DnsResult<Record> {
        let domain = get_domain(&options.fqdn)?;
        let name = relative_record_name(&options.fqdn, &domain);

        debug!(
            fqdn = %options.fqdn,
            record_type = %options.record_type,
            url = %self.base_url,
            "Creating record via webhook"
        );

        let request = CreateRecordRequest {
            fqdn: options.fqdn.clone(),
            domain: domain.clone(),
            name: name.clone(),
            record_type: options.record_type.to_string(),
            record_value: options.value.clone(),
            ttl: options.ttl,
            append: options.append,
        };

        let record_id = with_retries("create record", || self.create_record_once(&request)).await?;

        debug!(record_id = %record_id, "Record created via webhook");
        Ok(Record {
            domain,
            record_type: options.record_type,
            fqdn: options.fqdn.clone(),
            name,
            data: options.value.clone(),
            ttl: Some(options.ttl),
            resource_id: Some(record_id),
        })
    }

    async fn delete_record(&self, record: &Record) -> DnsResult<()> {
        let record_id = record.resource_id.as_deref().ok_or_else(|| {
            DnsProviderError::InvalidRecord(format!(
                "Record for '{}' has no webhook record id",
                record.fqdn
            ))
        })?;

        debug!(domain = %record.domain, record_id = %record_id, "Deleting record via webhook");

        let domain = record.domain.as_str();
        with_retries("delete record", || self.delete_record_once(domain, record_id)).await
    }
}

impl std::fmt::Debug for WebhookProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookProvider")
            .field("base_url", &self.base_url)
            .field("auth_header", &self.auth_header)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// Webhook API types

#[derive(Debug, Serialize)]
struct CreateRecordRequest {
    fqdn: String,
    domain: String,
    name: String,
    record_type: String,
    record_value: String,
    ttl: u32,
    append: bool,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    record_id: String,
}
