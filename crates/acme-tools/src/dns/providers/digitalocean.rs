//! DigitalOcean DNS provider implementation
//!
//! Uses the DigitalOcean Domains API to manage records for DNS-01 challenges.
//! API documentation: <https://docs.digitalocean.com/reference/api/api-reference/#tag/Domain-Records>

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{check_response, request_error, with_retries};
use crate::dns::provider::{
    get_domain, relative_record_name, DnsProvider, DnsProviderError, DnsResult,
};
use crate::types::{Record, RecordOptions, RecordType};

/// DigitalOcean Domains API base URL
const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com/v2/domains";

/// DigitalOcean DNS provider
pub struct DigitalOceanProvider {
    client: Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl DigitalOceanProvider {
    /// Create a new DigitalOcean DNS provider
    ///
    /// # Arguments
    ///
    /// * `token` - DigitalOcean API token
    /// * `timeout` - Request timeout
    pub fn new(token: &str, timeout: Duration) -> DnsResult<Self> {
        Self::with_base_url(DIGITALOCEAN_API_BASE, token, timeout)
    }

    /// Create a provider talking to a different API endpoint
    pub fn with_base_url(base_url: &str, token: &str, timeout: Duration) -> DnsResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            DnsProviderError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout,
        })
    }

    fn check_record_type(record_type: RecordType) -> DnsResult<RecordType> {
        if record_type == RecordType::Soa {
            return Err(DnsProviderError::InvalidRecordType(
                "Cannot manage SOA records using DigitalOcean API".to_string(),
            ));
        }
        Ok(record_type)
    }

    /// Get the records of a type defined for an FQDN
    pub async fn get_records(&self, fqdn: &str, record_type: RecordType) -> DnsResult<Vec<Record>> {
        let record_type = Self::check_record_type(record_type)?;
        let domain = get_domain(fqdn)?;
        let zone = domain.as_str();

        let response: DomainRecordsResponse =
            with_retries("list records", || self.list_records_once(zone, fqdn, record_type))
                .await?;

        trace!(
            fqdn = %fqdn,
            record_type = %record_type,
            count = response.domain_records.len(),
            "Listed DigitalOcean records"
        );

        response
            .domain_records
            .into_iter()
            .map(|item| item.into_record(fqdn, zone))
            .collect()
    }

    async fn list_records_once(
        &self,
        domain: &str,
        fqdn: &str,
        record_type: RecordType,
    ) -> DnsResult<DomainRecordsResponse> {
        let response = self
            .client
            .get(format!("{}/{}/records", self.base_url, domain))
            .bearer_auth(&self.token)
            .query(&[("name", fqdn), ("type", record_type.as_str())])
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout, "list records"))?;

        let response = check_response(response).await?;
        response.json().await.map_err(|e| {
            DnsProviderError::ApiRequest(format!("Failed to parse records response: {}", e))
        })
    }

    /// Look for an existing record matching the options
    ///
    /// Returns the record when one has the same data and TTL. Fails with
    /// [`DnsProviderError::RecordAlreadyExists`] when records exist but none
    /// matches.
    async fn find_existing(&self, options: &RecordOptions) -> DnsResult<Option<Record>> {
        let existing = self.get_records(&options.fqdn, options.record_type).await?;

        if let Some(record) = existing
            .iter()
            .find(|r| r.data == options.value && r.ttl == Some(options.ttl))
        {
            return Ok(Some(record.clone()));
        }

        if !existing.is_empty() {
            return Err(DnsProviderError::RecordAlreadyExists {
                fqdn: options.fqdn.clone(),
                record_type: options.record_type.to_string(),
            });
        }

        Ok(None)
    }

    async fn create_record_once(
        &self,
        domain: &str,
        request: &CreateRecordRequest,
    ) -> DnsResult<CreateRecordResponse> {
        let response = self
            .client
            .post(format!("{}/{}/records", self.base_url, domain))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout, "create record"))?;

        let response = check_response(response).await?;
        response.json().await.map_err(|e| {
            DnsProviderError::ApiRequest(format!("Failed to parse create response: {}", e))
        })
    }

    async fn delete_record_once(&self, domain: &str, resource_id: &str) -> DnsResult<()> {
        let response = self
            .client
            .delete(format!("{}/{}/records/{}", self.base_url, domain, resource_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| request_error(e, self.timeout, "delete record"))?;

        // 404 is fine - record might already be deleted
        if response.status() == StatusCode::NOT_FOUND {
            debug!(resource_id = %resource_id, "Record already deleted");
            return Ok(());
        }

        check_response(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    fn name(&self) -> &'static str {
        "digitalocean"
    }

    async fn create_record(&self, options: &RecordOptions) -> DnsResult<Record> {
        let record_type = Self::check_record_type(options.record_type)?;

        match self.find_existing(options).await {
            Ok(Some(existing)) => {
                debug!(fqdn = %options.fqdn, "Identical record already exists");
                return Ok(existing);
            }
            Ok(None) => {}
            Err(DnsProviderError::RecordAlreadyExists { .. }) if options.append => {
                debug!(fqdn = %options.fqdn, "Appending record next to existing values");
            }
            Err(e) => return Err(e),
        }

        let domain = get_domain(&options.fqdn)?;
        let request = CreateRecordRequest {
            r#type: record_type.as_str().to_string(),
            name: relative_record_name(&options.fqdn, &domain),
            data: options.value.clone(),
            ttl: options.ttl,
        };

        debug!(
            domain = %domain,
            name = %request.name,
            record_type = %record_type,
            "Creating DigitalOcean record"
        );

        let zone = domain.as_str();
        let response =
            with_retries("create record", || self.create_record_once(zone, &request)).await?;

        let record = response.domain_record.into_record(&options.fqdn, zone)?;
        debug!(resource_id = ?record.resource_id, "Record created successfully");
        Ok(record)
    }

    async fn delete_record(&self, record: &Record) -> DnsResult<()> {
        let resource_id = record.resource_id.as_deref().ok_or_else(|| {
            DnsProviderError::InvalidRecord(format!(
                "Record for '{}' has no DigitalOcean resource id",
                record.fqdn
            ))
        })?;

        debug!(domain = %record.domain, resource_id = %resource_id, "Deleting DigitalOcean record");

        let domain = record.domain.as_str();
        with_retries("delete record", || self.delete_record_once(domain, resource_id)).await
    }
}

impl fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// DigitalOcean API types

#[derive(Debug, Deserialize)]
struct DomainRecordsResponse {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    domain_record: DomainRecord,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    r#type: String,
    name: String,
    data: String,
    #[serde(default)]
    ttl: Option<u32>,
}

impl DomainRecord {
    fn into_record(self, fqdn: &str, domain: &str) -> DnsResult<Record> {
        Ok(Record {
            domain: domain.to_string(),
            record_type: self.r#type.parse()?,
            fqdn: fqdn.to_string(),
            name: self.name,
            data: self.data,
            ttl: self.ttl,
            resource_id: Some(self.id.to_string()),
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest {
    r#type: String,
    name: String,
    data: String,
    ttl: u32,
}
