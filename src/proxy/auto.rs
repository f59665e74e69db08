use super::{end_attempt_unless_dnssec, preferred_transport_or_udp, Candidate};
use crate::{
    account::{server_from_user_id, AccountConfig, AccountKey},
    dns::{is_literal_ip, DnsLookup, NaptrRecord, SrvRecord},
    transport::{default_port, transport_from_naptr_flag, SRV_TRANSPORTS},
    Result,
};
use rsip::transport::Transport;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, info};

/// Resolution stage of [`AutoProxyConnection`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum State {
    New,
    Naptr,
    NaptrSrv,
    NaptrSrvHosts,
    NaptrSrvHostIps,
    Srv,
    SrvHosts,
    SrvHostIps,
    Hosts,
    Ip,
}

/// Per-stage positions. Only the fields of stages already entered are
/// meaningful. A cursor moves past an entry only once its lookup succeeded,
/// so a failed lookup is repeated rather than skipped.
#[derive(Debug, Default)]
struct Cursors {
    naptr_records: Vec<NaptrRecord>,
    naptr_index: usize,
    srv_transport_index: usize,
    had_srv_results: bool,
    srv_records: Vec<SrvRecord>,
    srv_index: usize,
    addresses: Vec<SocketAddr>,
    address_index: usize,
    hosts: Option<Vec<SocketAddr>>,
    hosts_index: usize,
    ip_returned: bool,
}

/// RFC 3263 server location for an account's domain.
///
/// The domain's NAPTR records pick transports and SRV names; without NAPTR
/// records the `_sips._tcp`, `_sip._tcp` and `_sip._udp` SRV names are tried
/// in that order; without any SRV records the domain's own A/AAAA records are
/// used with the default transport. Addresses are produced lazily,
/// depth-first: all addresses of one SRV target before the next target, all
/// targets of one NAPTR record before the next record.
///
/// Only the first level that has data is used: once NAPTR records exist the
/// plain SRV names are never queried, and once any SRV name has records the
/// domain's A/AAAA records are never used.
pub struct AutoProxyConnection {
    account: Arc<dyn AccountConfig>,
    dns: Arc<dyn DnsLookup>,
    address: Option<String>,
    transport_override: Option<Transport>,
    domain: Option<String>,
    default_transport: Transport,
    transport: Transport,
    state: State,
    cursors: Cursors,
}

impl AutoProxyConnection {
    /// `address` replaces the domain derived from the account.
    /// `transport_override` replaces the account's preferred transport.
    pub fn new(
        account: Arc<dyn AccountConfig>,
        dns: Arc<dyn DnsLookup>,
        address: Option<String>,
        transport_override: Option<Transport>,
    ) -> Self {
        let mut connection = Self {
            account,
            dns,
            address,
            transport_override,
            domain: None,
            default_transport: Transport::Udp,
            transport: Transport::Udp,
            state: State::New,
            cursors: Cursors::default(),
        };
        connection.reset();
        connection
    }

    /// Domain (or literal address) being resolved, `None` for an account
    /// without registrar.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn default_transport(&self) -> &Transport {
        &self.default_transport
    }

    pub fn reset(&mut self) {
        self.default_transport = match &self.transport_override {
            Some(transport) => transport.clone(),
            None => preferred_transport_or_udp(self.account.as_ref()),
        };
        self.transport = self.default_transport.clone();
        self.cursors = Cursors::default();
        self.domain = self.target_domain();
        self.state = match self.domain.as_deref() {
            Some(domain) if is_literal_ip(domain) => State::Ip,
            _ => State::New,
        };
        match &self.domain {
            Some(domain) => info!("auto proxy reset: {} ({:?})", domain, self.state),
            None => info!("auto proxy reset: account has no registrar"),
        }
    }

    fn target_domain(&self) -> Option<String> {
        if let Some(address) = self.address.as_ref().filter(|a| !a.trim().is_empty()) {
            return Some(address.trim().to_string());
        }
        self.account
            .get_non_empty(AccountKey::UserId)
            .and_then(|user_id| server_from_user_id(&user_id))
            .or_else(|| self.account.get_non_empty(AccountKey::ServerAddress))
    }

    pub(crate) async fn next_address_from_dns(&mut self) -> Result<Option<Candidate>> {
        let Some(domain) = self.domain.clone() else {
            return Ok(None);
        };
        let result = self.step(&domain).await;
        end_attempt_unless_dnssec(&domain, result)
    }

    fn enter(&mut self, state: State) {
        debug!("auto proxy state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    async fn step(&mut self, domain: &str) -> Result<Option<Candidate>> {
        loop {
            match self.state {
                State::New => self.enter(State::Naptr),
                State::Ip => return self.literal_ip(domain).await,
                State::Naptr => {
                    let records = self.dns.lookup_naptr(domain).await?;
                    if records.is_empty() {
                        self.cursors.had_srv_results = false;
                        self.cursors.srv_transport_index = 0;
                        self.enter(State::Srv);
                    } else {
                        self.cursors.naptr_records = records;
                        self.cursors.naptr_index = 0;
                        self.enter(State::NaptrSrv);
                    }
                }
                State::NaptrSrv => {
                    if !self.next_naptr().await? {
                        return Ok(None);
                    }
                    self.enter(State::NaptrSrvHosts);
                }
                State::NaptrSrvHosts => {
                    if self.next_srv_target().await? {
                        self.enter(State::NaptrSrvHostIps);
                    } else {
                        self.enter(State::NaptrSrv);
                    }
                }
                State::NaptrSrvHostIps => match self.next_target_address() {
                    Some(candidate) => return Ok(Some(candidate)),
                    None => self.enter(State::NaptrSrvHosts),
                },
                State::Srv => {
                    if self.next_srv_transport(domain).await? {
                        self.enter(State::SrvHosts);
                    } else if !self.cursors.had_srv_results {
                        self.enter(State::Hosts);
                    } else {
                        return Ok(None);
                    }
                }
                State::SrvHosts => {
                    if self.next_srv_target().await? {
                        self.enter(State::SrvHostIps);
                    } else {
                        self.enter(State::Srv);
                    }
                }
                State::SrvHostIps => match self.next_target_address() {
                    Some(candidate) => return Ok(Some(candidate)),
                    None => self.enter(State::SrvHosts),
                },
                State::Hosts => return self.next_host(domain).await,
            }
        }
    }

    async fn literal_ip(&mut self, domain: &str) -> Result<Option<Candidate>> {
        if self.cursors.ip_returned {
            return Ok(None);
        }
        let ip = self.dns.resolve_ip(domain).await?;
        self.cursors.ip_returned = true;
        let port = default_port(&self.default_transport);
        Ok(Some((
            SocketAddr::new(ip, port),
            self.default_transport.clone(),
        )))
    }

    /// Moves to the next NAPTR record whose SRV name has records.
    async fn next_naptr(&mut self) -> Result<bool> {
        while let Some(record) = self
            .cursors
            .naptr_records
            .get(self.cursors.naptr_index)
            .cloned()
        {
            let srv_records = self.dns.lookup_srv_name(&record.service).await?;
            self.cursors.naptr_index += 1;
            if srv_records.is_empty() {
                debug!("NAPTR service {} has no SRV records", record.service);
                continue;
            }
            self.transport = transport_from_naptr_flag(&record.transport);
            self.cursors.srv_records = srv_records;
            self.cursors.srv_index = 0;
            return Ok(true);
        }
        Ok(false)
    }

    /// Moves to the next SRV name, in transport preference order, that has
    /// records.
    async fn next_srv_transport(&mut self, domain: &str) -> Result<bool> {
        while let Some((transport, service, proto)) = SRV_TRANSPORTS
            .get(self.cursors.srv_transport_index)
            .cloned()
        {
            let srv_records = self.dns.lookup_srv(service, proto, domain).await?;
            self.cursors.srv_transport_index += 1;
            if srv_records.is_empty() {
                continue;
            }
            self.cursors.had_srv_results = true;
            self.transport = transport;
            self.cursors.srv_records = srv_records;
            self.cursors.srv_index = 0;
            return Ok(true);
        }
        Ok(false)
    }

    /// Moves to the next SRV target that resolves to at least one address.
    async fn next_srv_target(&mut self) -> Result<bool> {
        while let Some(record) = self
            .cursors
            .srv_records
            .get(self.cursors.srv_index)
            .cloned()
        {
            let addresses = self
                .dns
                .lookup_addresses(&record.target, record.port)
                .await?;
            self.cursors.srv_index += 1;
            if addresses.is_empty() {
                debug!("SRV target {} has no addresses", record.target);
                continue;
            }
            self.cursors.addresses = addresses;
            self.cursors.address_index = 0;
            return Ok(true);
        }
        Ok(false)
    }

    fn next_target_address(&mut self) -> Option<Candidate> {
        let addr = *self.cursors.addresses.get(self.cursors.address_index)?;
        self.cursors.address_index += 1;
        Some((addr, self.transport.clone()))
    }

    async fn next_host(&mut self, domain: &str) -> Result<Option<Candidate>> {
        if self.cursors.hosts.is_none() {
            let port = default_port(&self.default_transport);
            self.cursors.hosts = Some(self.dns.lookup_addresses(domain, port).await?);
            self.cursors.hosts_index = 0;
        }
        let next = self
            .cursors
            .hosts
            .as_ref()
            .and_then(|hosts| hosts.get(self.cursors.hosts_index))
            .copied();
        Ok(next.map(|addr| {
            self.cursors.hosts_index += 1;
            self.transport = self.default_transport.clone();
            (addr, self.default_transport.clone())
        }))
    }
}
