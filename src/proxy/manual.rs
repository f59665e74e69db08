use super::{end_attempt_unless_dnssec, Candidate};
use crate::{
    account::{AccountConfig, AccountKey},
    dns::DnsLookup,
    transport::{default_port, parse_transport},
    Error, Result,
};
use rsip::transport::Transport;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, info};

/// A proxy configured by hand as host, port and transport.
///
/// The host is resolved with A/AAAA queries only; NAPTR and SRV records are
/// ignored. Every address uses the configured transport.
pub struct ManualProxyConnection {
    account: Arc<dyn AccountConfig>,
    dns: Arc<dyn DnsLookup>,
    address_override: Option<String>,
    port_override: Option<u16>,
    transport_override: Option<Transport>,
    address: String,
    port: u16,
    transport: Transport,
    lookups: Option<Vec<SocketAddr>>,
    lookup_index: usize,
}

impl ManualProxyConnection {
    /// Fails with [`Error::ConfigurationError`] when the account has no proxy
    /// address, or an invalid port or transport.
    pub fn new(
        account: Arc<dyn AccountConfig>,
        dns: Arc<dyn DnsLookup>,
        address_override: Option<String>,
        port_override: Option<u16>,
        transport_override: Option<Transport>,
    ) -> Result<Self> {
        let mut connection = Self {
            account,
            dns,
            address_override,
            port_override,
            transport_override,
            address: String::new(),
            port: 0,
            transport: Transport::Udp,
            lookups: None,
            lookup_index: 0,
        };
        connection.load_config()?;
        Ok(connection)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn load_config(&mut self) -> Result<()> {
        let transport = match &self.transport_override {
            Some(transport) => transport.clone(),
            None => match self.account.get_non_empty(AccountKey::PreferredTransport) {
                Some(value) => parse_transport(&value)?,
                None => Transport::Udp,
            },
        };
        let address = self
            .address_override
            .clone()
            .filter(|a| !a.trim().is_empty())
            .or_else(|| self.account.get_non_empty(AccountKey::ProxyAddress))
            .ok_or_else(|| {
                Error::ConfigurationError("manual proxy without PROXY_ADDRESS".to_string())
            })?;
        let port = match self.port_override {
            Some(port) => port,
            None => match self.account.get_non_empty(AccountKey::ProxyPort) {
                Some(value) => value.parse::<u16>().map_err(|e| {
                    Error::ConfigurationError(format!("invalid PROXY_PORT {}: {}", value, e))
                })?,
                None => default_port(&transport),
            },
        };

        self.address = address.trim().to_string();
        self.port = port;
        self.transport = transport;
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        self.load_config()?;
        self.lookups = None;
        self.lookup_index = 0;
        info!(
            "manual proxy reset: {}:{} {:?}",
            self.address, self.port, self.transport
        );
        Ok(())
    }

    pub(crate) async fn next_address_from_dns(&mut self) -> Result<Option<Candidate>> {
        let result = self.step().await;
        end_attempt_unless_dnssec(&self.address, result)
    }

    async fn step(&mut self) -> Result<Option<Candidate>> {
        if self.lookups.is_none() {
            self.lookup_index = 0;
            let addresses = self.dns.lookup_addresses(&self.address, self.port).await?;
            if addresses.is_empty() {
                debug!("manual proxy {} has no addresses", self.address);
                return Ok(None);
            }
            self.lookups = Some(addresses);
        }

        let next = self
            .lookups
            .as_ref()
            .and_then(|lookups| lookups.get(self.lookup_index))
            .copied();
        match next {
            Some(addr) => {
                self.lookup_index += 1;
                Ok(Some((addr, self.transport.clone())))
            }
            None => {
                // resolve again on the next attempt
                self.lookups = None;
                Ok(None)
            }
        }
    }
}
