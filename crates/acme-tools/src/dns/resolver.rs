//! DNS resolution for propagation checks and diagnostics
//!
//! [`Resolver`] is the seam the propagation checker queries through;
//! [`HickoryResolver`] implements it on top of `hickory-resolver`.

use std::fmt::Debug;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType as HickoryRecordType};
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{Resolver as HickoryBaseResolver, TokioResolver};
use tracing::{debug, trace};

use super::provider::{DnsProviderError, DnsResult};
use crate::types::RecordType;

/// Public resolvers queried when no nameservers are configured
pub const DEFAULT_NAMESERVERS: [IpAddr; 3] = [
    IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), // Google DNS
    IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1)), // Cloudflare DNS
    IpAddr::V4(Ipv4Addr::new(9, 9, 9, 9)), // Quad9
];

/// Trait for DNS resolvers
#[async_trait]
pub trait Resolver: Send + Sync + Debug {
    /// Resolve a DNS query for the given FQDN and record type
    ///
    /// - `A`: IPv4 addresses of the FQDN
    /// - `CNAME`: alias targets, without trailing dot
    /// - `NS`: nameservers of the closest enclosing zone
    /// - `TXT`: text values, one entry per character-string
    /// - `SOA`: primary nameserver of the closest enclosing zone
    ///
    /// A name without records (NXDOMAIN, empty answer) resolves to an empty
    /// list; only genuine lookup failures are errors.
    async fn resolve(&self, fqdn: &str, record_type: RecordType) -> DnsResult<Vec<String>>;
}

/// Resolver backed by `hickory-resolver`
///
/// Caching is disabled so repeated queries observe fresh answers.
#[derive(Debug)]
pub struct HickoryResolver {
    resolver: TokioResolver,
    nameservers: Vec<IpAddr>,
}

impl HickoryResolver {
    /// Create a resolver querying the given nameservers
    ///
    /// An empty list selects [`DEFAULT_NAMESERVERS`].
    pub fn new(nameservers: &[IpAddr]) -> Self {
        let nameservers = if nameservers.is_empty() {
            DEFAULT_NAMESERVERS.to_vec()
        } else {
            nameservers.to_vec()
        };

        let mut resolver_config = ResolverConfig::new();
        for ip in &nameservers {
            resolver_config.add_name_server(NameServerConfig::new(
                SocketAddr::new(*ip, 53),
                Protocol::Udp,
            ));
        }

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(5);
        opts.attempts = 3;
        opts.cache_size = 0;

        let resolver =
            HickoryBaseResolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        Self {
            resolver,
            nameservers,
        }
    }

    /// Nameservers this resolver queries
    pub fn nameservers(&self) -> &[IpAddr] {
        &self.nameservers
    }

    /// Run a single lookup and render matching answers as text
    async fn lookup(&self, name: &str, record_type: RecordType) -> DnsResult<Vec<String>> {
        let query_name = if name.ends_with('.') {
            name.to_string()
        } else {
            format!("{}.", name)
        };

        let lookup = match self
            .resolver
            .lookup(query_name.as_str(), to_hickory(record_type))
            .await
        {
            Ok(lookup) => lookup,
            Err(e) if e.is_no_records_found() || e.is_nx_domain() => {
                // NXDOMAIN and empty answers are normal while records propagate
                trace!(name = %name, record_type = %record_type, "No records found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(DnsProviderError::Lookup(format!(
                    "{} lookup for '{}' failed: {}",
                    record_type, name, e
                )));
            }
        };

        let values = lookup
            .iter()
            .flat_map(|rdata| rdata_values(rdata, record_type))
            .collect::<Vec<_>>();

        trace!(name = %name, record_type = %record_type, values = ?values, "Lookup answered");
        Ok(values)
    }

    /// Look up `record_type` for the name, then for each parent until found
    async fn lookup_walking_up(&self, fqdn: &str, record_type: RecordType) -> DnsResult<Vec<String>> {
        walk_up(fqdn, move |name| async move { self.lookup(&name, record_type).await }).await
    }
}

/// Query `fqdn` and then each parent name until one has an answer
///
/// A failed lookup moves on to the parent. The last failure is returned only
/// when no name answered; the walk stops before the top-level domain.
async fn walk_up<F, Fut>(fqdn: &str, mut lookup: F) -> DnsResult<Vec<String>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DnsResult<Vec<String>>>,
{
    let mut domain = fqdn.trim_end_matches('.');
    let mut last_error = None;

    while domain.contains('.') {
        match lookup(domain.to_string()).await {
            Ok(values) if !values.is_empty() => return Ok(values),
            Ok(_) => {}
            Err(e) => {
                debug!(name = %domain, error = %e, "Lookup failed, trying parent");
                last_error = Some(e);
            }
        }
        domain = domain.split_once('.').map(|(_, parent)| parent).unwrap_or("");
    }

    match last_error {
        Some(e) => Err(e),
        None => Ok(Vec::new()),
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new(&[])
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(&self, fqdn: &str, record_type: RecordType) -> DnsResult<Vec<String>> {
        match record_type {
            RecordType::A | RecordType::Cname | RecordType::Txt => {
                self.lookup(fqdn, record_type).await
            }
            RecordType::Ns | RecordType::Soa => self.lookup_walking_up(fqdn, record_type).await,
        }
    }
}

fn to_hickory(record_type: RecordType) -> HickoryRecordType {
    match record_type {
        RecordType::A => HickoryRecordType::A,
        RecordType::Cname => HickoryRecordType::CNAME,
        RecordType::Ns => HickoryRecordType::NS,
        RecordType::Txt => HickoryRecordType::TXT,
        RecordType::Soa => HickoryRecordType::SOA,
    }
}

/// Text values of one answer, if it has the requested type
///
/// Answers of other types (e.g. the CNAME chain of an A query) are skipped.
fn rdata_values(rdata: &RData, record_type: RecordType) -> Vec<String> {
    match (rdata, record_type) {
        (RData::A(a), RecordType::A) => vec![a.to_string()],
        (RData::CNAME(cname), RecordType::Cname) => {
            vec![cname.to_string().trim_end_matches('.').to_string()]
        }
        (RData::NS(ns), RecordType::Ns) => vec![ns.to_string()],
        (RData::SOA(soa), RecordType::Soa) => vec![soa.mname().to_string()],
        (RData::TXT(txt), RecordType::Txt) => txt
            .txt_data()
            .iter()
            .map(|data| String::from_utf8_lossy(data).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hickory_resolver::proto::rr::rdata::{CNAME, SOA, TXT};
    use hickory_resolver::proto::rr::Name;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[test]
    fn test_record_type_mapping() {
        assert_eq!(to_hickory(RecordType::Txt), HickoryRecordType::TXT);
        assert_eq!(to_hickory(RecordType::Soa), HickoryRecordType::SOA);
        assert_eq!(to_hickory(RecordType::Cname), HickoryRecordType::CNAME);
    }

    #[tokio::test]
    async fn test_default_nameservers() {
        let resolver = HickoryResolver::default();
        assert_eq!(resolver.nameservers(), &DEFAULT_NAMESERVERS);

        let custom = HickoryResolver::new(&[IpAddr::V4(Ipv4Addr::new(127, 0, 0, 53))]);
        assert_eq!(custom.nameservers().len(), 1);
    }

    #[test]
    fn test_cname_target_without_trailing_dot() {
        let rdata = RData::CNAME(CNAME(Name::from_ascii("target.example.net.").unwrap()));
        assert_eq!(
            rdata_values(&rdata, RecordType::Cname),
            vec!["target.example.net".to_string()]
        );
    }

    #[test]
    fn test_txt_character_strings() {
        let rdata = RData::TXT(TXT::new(vec!["first".to_string(), "second".to_string()]));
        assert_eq!(
            rdata_values(&rdata, RecordType::Txt),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_soa_primary_nameserver() {
        let rdata = RData::SOA(SOA::new(
            Name::from_ascii("ns1.example.com.").unwrap(),
            Name::from_ascii("hostmaster.example.com.").unwrap(),
            2024010101,
            3600,
            600,
            86400,
            300,
        ));
        assert_eq!(
            rdata_values(&rdata, RecordType::Soa),
            vec!["ns1.example.com.".to_string()]
        );
    }

    #[test]
    fn test_other_answer_types_are_skipped() {
        let rdata = RData::CNAME(CNAME(Name::from_ascii("target.example.net.").unwrap()));
        assert!(rdata_values(&rdata, RecordType::A).is_empty());
        assert!(rdata_values(&rdata, RecordType::Txt).is_empty());
    }

    #[tokio::test]
    async fn test_walk_up_stops_at_first_answer() {
        let queried = Mutex::new(Vec::new());
        let values = walk_up("_acme-challenge.www.example.com", |name| {
            queried.lock().push(name.clone());
            async move {
                if name == "www.example.com" {
                    Ok(vec!["ns1.example.com.".to_string()])
                } else {
                    Ok(Vec::new())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(values, vec!["ns1.example.com.".to_string()]);
        assert_eq!(
            *queried.lock(),
            vec!["_acme-challenge.www.example.com", "www.example.com"]
        );
    }

    #[tokio::test]
    async fn test_walk_up_ends_before_tld() {
        let queried = Mutex::new(Vec::new());
        let values = walk_up("_acme-challenge.example.com.", |name| {
            queried.lock().push(name);
            async { Ok(Vec::new()) }
        })
        .await
        .unwrap();

        assert!(values.is_empty());
        assert_eq!(
            *queried.lock(),
            vec!["_acme-challenge.example.com", "example.com"]
        );
    }

    #[tokio::test]
    async fn test_walk_up_skips_failing_names() {
        let values = walk_up("_acme-challenge.example.com", |name| async move {
            if name.starts_with("_acme-challenge") {
                Err(DnsProviderError::Lookup("SERVFAIL".to_string()))
            } else {
                Ok(vec!["ns1.example.com.".to_string()])
            }
        })
        .await
        .unwrap();
        assert_eq!(values, vec!["ns1.example.com.".to_string()]);

        let result = walk_up("_acme-challenge.example.com", |_| async {
            Err::<Vec<String>, _>(DnsProviderError::Lookup("SERVFAIL".to_string()))
        })
        .await;
        assert!(matches!(result, Err(DnsProviderError::Lookup(_))));
    }

    /// In-memory resolver for tests
    ///
    /// Answers become visible once they have been queried `visible_after`
    /// times, to simulate propagation delay.
    #[derive(Debug, Default)]
    pub struct MockResolver {
        pub answers: Mutex<HashMap<(String, RecordType), Vec<String>>>,
        pub queries: Mutex<Vec<String>>,
        pub visible_after: usize,
    }

    impl MockResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(mut self, queries: usize) -> Self {
            self.visible_after = queries;
            self
        }

        pub fn insert(&self, fqdn: &str, record_type: RecordType, value: &str) {
            self.answers
                .lock()
                .entry((fqdn.to_string(), record_type))
                .or_default()
                .push(value.to_string());
        }

        pub fn query_count(&self) -> usize {
            self.queries.lock().len()
        }
    }

    #[async_trait]
    impl Resolver for MockResolver {
        async fn resolve(&self, fqdn: &str, record_type: RecordType) -> DnsResult<Vec<String>> {
            let seen = {
                let mut queries = self.queries.lock();
                queries.push(fqdn.to_string());
                queries.iter().filter(|q| q.as_str() == fqdn).count()
            };
            if seen <= self.visible_after {
                return Ok(Vec::new());
            }
            Ok(self
                .answers
                .lock()
                .get(&(fqdn.to_string(), record_type))
                .cloned()
                .unwrap_or_default())
        }
    }
}
