//! Proxy address iteration
//!
//! A [`ProxyConnection`] hands out the candidate addresses for an account's
//! SIP proxy one at a time. Callers follow a fixed pattern:
//!
//! ```rust,no_run
//! # use sip_proxy_resolver::{ProxyConnection, Result};
//! # async fn connect(proxy: &mut ProxyConnection) -> Result<()> {
//! proxy.reset()?;
//! while proxy.next_address().await? {
//!     let addr = proxy.address().expect("address after next_address");
//!     let transport = proxy.transport();
//!     // try to connect to `addr` over `transport`, break on success
//! #   let _ = (addr, transport);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Within one `reset()` epoch no `ip:port/transport` tuple is returned twice,
//! even when the underlying resolver reaches the same address through
//! different NAPTR or SRV branches.
use crate::{
    account::{AccountConfig, AccountKey},
    dns::DnsLookup,
    transport::{parse_transport, transport_name, SipAddr},
    Error, Result,
};
use rsip::transport::Transport;
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use tracing::{debug, info, warn};

pub mod auto;
pub mod manual;
pub use auto::{AutoProxyConnection, State};
pub use manual::ManualProxyConnection;
#[cfg(test)]
mod tests;

/// A resolved address and the transport to reach it with.
pub(crate) type Candidate = (SocketAddr, Transport);

/// Formats `ip:port/TRANSPORT`, bracketing IPv6 addresses.
pub fn outbound_proxy_string(addr: &SocketAddr, transport: &Transport) -> String {
    format!("{}/{}", addr, transport_name(transport))
}

/// Keeps DNSSEC failures and turns every other error into exhaustion.
pub(crate) fn end_attempt_unless_dnssec(
    target: &str,
    result: Result<Option<Candidate>>,
) -> Result<Option<Candidate>> {
    match result {
        Err(e) if e.is_dnssec_failure() => Err(e),
        Err(e) => {
            warn!("resolving {} failed, no more addresses: {}", target, e);
            Ok(None)
        }
        r => r,
    }
}

pub enum ProxyKind {
    Auto(AutoProxyConnection),
    Manual(ManualProxyConnection),
}

/// Iterator over the candidate addresses of an account's SIP proxy.
pub struct ProxyConnection {
    kind: ProxyKind,
    transport: Transport,
    socket_address: Option<SocketAddr>,
    returned_addresses: Vec<String>,
    exhausted: bool,
    dnssec_failure: Option<Error>,
}

impl ProxyConnection {
    pub fn builder() -> ProxyConnectionBuilder {
        ProxyConnectionBuilder::new()
    }

    pub fn new(kind: ProxyKind) -> Self {
        let transport = match &kind {
            ProxyKind::Auto(c) => c.default_transport().clone(),
            ProxyKind::Manual(c) => c.transport().clone(),
        };
        Self {
            kind,
            transport,
            socket_address: None,
            returned_addresses: Vec::new(),
            exhausted: false,
            dnssec_failure: None,
        }
    }

    pub fn kind(&self) -> &ProxyKind {
        &self.kind
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.kind, ProxyKind::Auto(_))
    }

    /// Address returned by the last successful `next_address`.
    pub fn address(&self) -> Option<SocketAddr> {
        self.socket_address
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// `ip:port/TRANSPORT` of the current address, `None` before the first
    /// address was resolved.
    pub fn outbound_proxy_string(&self) -> Option<String> {
        self.socket_address
            .as_ref()
            .map(|addr| outbound_proxy_string(addr, &self.transport))
    }

    /// Current address as a transport-layer target.
    pub fn sip_addr(&self) -> Option<SipAddr> {
        self.socket_address
            .map(|addr| SipAddr::from_socket(self.transport.clone(), addr))
    }

    /// Whether `addr` is the proxy currently selected.
    pub fn is_same_address(&self, addr: &IpAddr) -> bool {
        self.socket_address
            .map(|current| current.ip() == *addr)
            .unwrap_or(false)
    }

    /// Advances to the next address not yet returned since the last
    /// `reset()`. `Ok(false)` means there are no more addresses; it stays
    /// that way until `reset()`.
    ///
    /// Fails only with [`Error::DnssecFailure`]. The failure is sticky: every
    /// later call returns it again until `reset()`.
    pub async fn next_address(&mut self) -> Result<bool> {
        if let Some(e) = &self.dnssec_failure {
            return Err(e.clone());
        }
        if self.exhausted {
            return Ok(false);
        }
        loop {
            let result = match &mut self.kind {
                ProxyKind::Auto(c) => c.next_address_from_dns().await,
                ProxyKind::Manual(c) => c.next_address_from_dns().await,
            };
            let candidate = match result {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!("proxy resolution stopped: {}", e);
                    self.dnssec_failure = Some(e.clone());
                    return Err(e);
                }
            };
            let Some((addr, transport)) = candidate else {
                debug!(
                    "proxy addresses exhausted after {} candidates",
                    self.returned_addresses.len()
                );
                self.exhausted = true;
                return Ok(false);
            };
            let key = outbound_proxy_string(&addr, &transport);
            if self.returned_addresses.contains(&key) {
                debug!("skipping already returned proxy address {}", key);
                continue;
            }
            info!("next proxy address: {}", key);
            self.returned_addresses.push(key);
            self.socket_address = Some(addr);
            self.transport = transport;
            return Ok(true);
        }
    }

    /// Starts a new resolution attempt, re-reading account configuration.
    pub fn reset(&mut self) -> Result<()> {
        self.returned_addresses.clear();
        self.exhausted = false;
        self.dnssec_failure = None;
        match &mut self.kind {
            ProxyKind::Auto(c) => c.reset(),
            ProxyKind::Manual(c) => c.reset()?,
        }
        Ok(())
    }

    /// Addresses returned since the last `reset()`, oldest first.
    pub fn returned_addresses(&self) -> &[String] {
        &self.returned_addresses
    }
}

impl fmt::Display for ProxyConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_auto() { "auto" } else { "manual" };
        match self.outbound_proxy_string() {
            Some(current) => write!(f, "{} proxy {}", mode, current),
            None => write!(f, "{} proxy (unresolved)", mode),
        }
    }
}

/// Chooses between automatic (DNS based) and manual proxy resolution from
/// the account's `PROXY_AUTO_CONFIG` property, which defaults to automatic.
#[derive(Default)]
pub struct ProxyConnectionBuilder {
    account: Option<Arc<dyn AccountConfig>>,
    dns: Option<Arc<dyn DnsLookup>>,
    address: Option<String>,
    port: Option<u16>,
    default_transport: Option<Transport>,
}

impl ProxyConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, account: Arc<dyn AccountConfig>) -> Self {
        self.account.replace(account);
        self
    }

    pub fn with_dns(mut self, dns: Arc<dyn DnsLookup>) -> Self {
        self.dns.replace(dns);
        self
    }

    /// Resolve this host instead of the account's domain or proxy address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address.replace(address.into());
        self
    }

    /// Port for a manually configured proxy, overriding `PROXY_PORT`.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port.replace(port);
        self
    }

    /// Transport used where DNS does not select one, overriding
    /// `PREFERRED_TRANSPORT`.
    pub fn with_default_transport(mut self, transport: Transport) -> Self {
        self.default_transport.replace(transport);
        self
    }

    pub fn build(self) -> Result<ProxyConnection> {
        let account = self
            .account
            .ok_or_else(|| Error::ConfigurationError("account is required".to_string()))?;
        let dns = self
            .dns
            .ok_or_else(|| Error::ConfigurationError("DNS lookup is required".to_string()))?;

        let kind = if account.get_bool(AccountKey::ProxyAutoConfig, true) {
            ProxyKind::Auto(AutoProxyConnection::new(
                account,
                dns,
                self.address,
                self.default_transport,
            ))
        } else {
            ProxyKind::Manual(ManualProxyConnection::new(
                account,
                dns,
                self.address,
                self.port,
                self.default_transport,
            )?)
        };
        Ok(ProxyConnection::new(kind))
    }
}

/// Preferred transport for automatic resolution; unusable values fall back
/// to UDP.
pub(crate) fn preferred_transport_or_udp(account: &dyn AccountConfig) -> Transport {
    match account.get_non_empty(AccountKey::PreferredTransport) {
        Some(value) => parse_transport(&value).unwrap_or_else(|e| {
            warn!("{}, using UDP", e);
            Transport::Udp
        }),
        None => Transport::Udp,
    }
}
