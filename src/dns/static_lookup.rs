use super::{
    normalize_name, parse_literal_ip, srv_name, validate_name, DnsLookup, NaptrRecord, SrvRecord,
};
use crate::{Error, Result};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Mutex,
};

/// A query received by [`StaticLookup`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Query {
    ResolveIp(String),
    Naptr(String),
    Srv {
        service: String,
        proto: String,
        domain: String,
    },
    SrvName(String),
    Addresses { host: String, port: u16 },
}

/// In-memory [`DnsLookup`] for tests and offline development.
///
/// Names are matched case-insensitively and without the root dot. Unknown
/// names answer with no records. Every query is appended to a journal.
///
/// ```rust
/// use sip_proxy_resolver::dns::{DnsLookup, StaticLookup};
///
/// # async fn example() -> sip_proxy_resolver::Result<()> {
/// let dns = StaticLookup::new()
///     .with_srv("_sip._udp.example.com", "sip1.example.com", 5060)
///     .with_host("sip1.example.com", "192.0.2.10".parse().unwrap());
/// let srv = dns.lookup_srv("sip", "udp", "example.com").await?;
/// assert_eq!(srv[0].target, "sip1.example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticLookup {
    naptr: HashMap<String, Vec<NaptrRecord>>,
    srv: HashMap<String, Vec<SrvRecord>>,
    hosts: HashMap<String, Vec<IpAddr>>,
    failures: HashMap<String, Error>,
    journal: Mutex<Vec<Query>>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_naptr(mut self, domain: &str, transport: &str, service: &str) -> Self {
        self.naptr
            .entry(normalize_name(domain))
            .or_default()
            .push(NaptrRecord::new(transport, service));
        self
    }

    pub fn with_srv(mut self, name: &str, target: &str, port: u16) -> Self {
        self.srv
            .entry(normalize_name(name))
            .or_default()
            .push(SrvRecord::new(target, port));
        self
    }

    pub fn with_host(mut self, host: &str, ip: IpAddr) -> Self {
        self.hosts.entry(normalize_name(host)).or_default().push(ip);
        self
    }

    /// Every query for `name` fails with `error`.
    pub fn with_failure(mut self, name: &str, error: Error) -> Self {
        self.failures.insert(normalize_name(name), error);
        self
    }

    pub fn queries(&self) -> Vec<Query> {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_queries(&self) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn record(&self, query: Query) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(query);
    }

    fn check(&self, name: &str) -> Result<String> {
        let key = normalize_name(name);
        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }
        validate_name(name)?;
        Ok(key)
    }

    fn srv_records(&self, name: &str) -> Result<Vec<SrvRecord>> {
        let key = self.check(name)?;
        Ok(self.srv.get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DnsLookup for StaticLookup {
    async fn resolve_ip(&self, name: &str) -> Result<IpAddr> {
        self.record(Query::ResolveIp(name.to_string()));
        if let Some(ip) = parse_literal_ip(name) {
            return Ok(ip);
        }
        let key = self.check(name)?;
        self.hosts
            .get(&key)
            .and_then(|ips| ips.first().copied())
            .ok_or_else(|| Error::UnknownHost(name.to_string()))
    }

    async fn lookup_naptr(&self, domain: &str) -> Result<Vec<NaptrRecord>> {
        self.record(Query::Naptr(domain.to_string()));
        let key = self.check(domain)?;
        Ok(self.naptr.get(&key).cloned().unwrap_or_default())
    }

    async fn lookup_srv_name(&self, name: &str) -> Result<Vec<SrvRecord>> {
        self.record(Query::SrvName(name.to_string()));
        self.srv_records(name)
    }

    async fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        domain: &str,
    ) -> Result<Vec<SrvRecord>> {
        self.record(Query::Srv {
            service: service.to_string(),
            proto: proto.to_string(),
            domain: domain.to_string(),
        });
        self.srv_records(&srv_name(service, proto, domain))
    }

    async fn lookup_addresses(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        self.record(Query::Addresses {
            host: host.to_string(),
            port,
        });
        if let Some(ip) = parse_literal_ip(host) {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let key = self.check(host)?;
        Ok(self
            .hosts
            .get(&key)
            .map(|ips| ips.iter().map(|ip| SocketAddr::new(*ip, port)).collect())
            .unwrap_or_default())
    }
}
