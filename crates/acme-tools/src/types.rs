//! DNS record types shared by providers and resolvers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::dns::DnsProviderError;

/// Record types supported for queries and provider operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// Maps a hostname to an IPv4 address
    A,
    /// Alias for a canonical hostname
    Cname,
    /// Nameservers serving the zone
    Ns,
    /// Free-form text, used for DNS-01 verification
    Txt,
    /// Start of authority of the zone
    Soa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Soa => "SOA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DnsProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "CNAME" => Ok(RecordType::Cname),
            "NS" => Ok(RecordType::Ns),
            "TXT" => Ok(RecordType::Txt),
            "SOA" => Ok(RecordType::Soa),
            _ => Err(DnsProviderError::InvalidRecordType(format!(
                "Unsupported record type: {}",
                s
            ))),
        }
    }
}

/// A DNS record managed through a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// The zone (registrable domain) the record lives in
    pub domain: String,
    /// The type of the record
    pub record_type: RecordType,
    /// Fully qualified name defined by the record
    pub fqdn: String,
    /// Record name relative to the zone (`@` for the apex)
    pub name: String,
    /// Record data (address, target, text, ...)
    pub data: String,
    /// Time to live in seconds
    pub ttl: Option<u32>,
    /// Provider-side identifier, required for deletion
    pub resource_id: Option<String>,
}

/// Options for creating a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOptions {
    /// Fully qualified name to set the record for
    pub fqdn: String,
    /// Record type to create
    pub record_type: RecordType,
    /// Record value
    pub value: String,
    /// Time to live in seconds
    pub ttl: u32,
    /// Do not fail when a record with a different value already exists
    pub append: bool,
}

impl RecordOptions {
    /// Options for a DNS-01 challenge TXT record
    pub fn txt(fqdn: impl Into<String>, value: impl Into<String>, ttl: u32) -> Self {
        Self {
            fqdn: fqdn.into(),
            record_type: RecordType::Txt,
            value: value.into(),
            ttl,
            append: true,
        }
    }
}
