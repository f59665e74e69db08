//! DNS lookup gateway
//!
//! The resolver state machine only talks to DNS through [`DnsLookup`]. A
//! lookup that finds nothing answers with an empty list; errors are reserved
//! for malformed names ([`Error::ParseError`]), resolver failures
//! ([`Error::DnsResolutionError`]) and failed DNSSEC validation
//! ([`Error::DnssecFailure`]). The latter must never be turned into an empty
//! answer by an implementation, or a resolver would silently fall back to a
//! less preferred stage.
use crate::{Error, Result};
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};

pub mod hickory;
pub mod static_lookup;
pub use hickory::HickoryLookup;
pub use static_lookup::{Query, StaticLookup};
#[cfg(test)]
mod tests;

/// A SIP NAPTR record reduced to what server location needs.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NaptrRecord {
    /// `TLS`, `TCP` or `UDP`
    pub transport: String,
    /// SRV name to query next, e.g. `_sips._tcp.example.com`
    pub service: String,
}

impl NaptrRecord {
    pub fn new(transport: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            service: service.into(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SrvRecord {
    pub target: String,
    pub port: u16,
}

impl SrvRecord {
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self {
            target: target.into(),
            port,
        }
    }
}

/// DNS queries used by RFC 3263 server location.
///
/// Record lists are returned already ordered by preference (NAPTR order and
/// preference, SRV priority and weight).
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Parses a literal address or resolves a name to its first address.
    async fn resolve_ip(&self, name: &str) -> Result<IpAddr>;

    async fn lookup_naptr(&self, domain: &str) -> Result<Vec<NaptrRecord>>;

    /// SRV query for a complete service name such as `_sip._udp.example.com`.
    async fn lookup_srv_name(&self, name: &str) -> Result<Vec<SrvRecord>>;

    async fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        domain: &str,
    ) -> Result<Vec<SrvRecord>> {
        self.lookup_srv_name(&srv_name(service, proto, domain)).await
    }

    /// A and AAAA records of `host`, each paired with `port`.
    async fn lookup_addresses(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>>;
}

pub fn srv_name(service: &str, proto: &str, domain: &str) -> String {
    format!("_{}._{}.{}", service, proto, domain)
}

/// Accepts IPv4, IPv6 and bracketed IPv6 literals.
pub fn is_literal_ip(text: &str) -> bool {
    parse_literal_ip(text).is_some()
}

pub fn parse_literal_ip(text: &str) -> Option<IpAddr> {
    let text = text.trim();
    let text = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);
    text.parse().ok()
}

/// Lower-cased name without the root dot, used as a lookup key.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Checks that `name` is a syntactically valid domain name.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        return Err(Error::ParseError(format!("empty name: {:?}", name)));
    }
    if trimmed.len() > 253 {
        return Err(Error::ParseError(format!("name too long: {}", name)));
    }
    for label in trimmed.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(Error::ParseError(format!("invalid label in {:?}", name)));
        }
        if label
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '@')
        {
            return Err(Error::ParseError(format!("invalid character in {:?}", name)));
        }
    }
    Ok(())
}
