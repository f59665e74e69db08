use super::{parse_literal_ip, DnsLookup, NaptrRecord, SrvRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    lookup::Lookup,
    name_server::TokioConnectionProvider,
    proto::rr::{Name, RData, RecordType},
    TokioResolver,
};
use std::{
    fmt,
    net::{IpAddr, SocketAddr},
};
use tracing::{debug, warn};

/// [`DnsLookup`] backed by hickory-dns.
///
/// NXDOMAIN and empty answers are reported as "no records". Any other
/// resolver failure (SERVFAIL, timeout) is [`Error::DnsResolutionError`].
/// With validation enabled hickory checks DNSSEC itself; bogus answers and
/// failures to obtain a validated answer become [`Error::DnssecFailure`].
#[derive(Clone)]
pub struct HickoryLookup {
    resolver: TokioResolver,
    validate: bool,
}

/// Applies what server location expects from the resolver: both A and AAAA
/// records for every host, and optional DNSSEC validation.
pub fn configure_options(opts: &mut ResolverOpts, validate: bool) {
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
    opts.validate = validate;
}

impl HickoryLookup {
    /// Uses the system resolver configuration (`/etc/resolv.conf` or the
    /// platform equivalent).
    pub fn from_system(validate: bool) -> Result<Self> {
        let mut builder = TokioResolver::builder_tokio()
            .map_err(|e| Error::DnsResolutionError(format!("system resolver: {}", e)))?;
        configure_options(builder.options_mut(), validate);
        Ok(Self {
            resolver: builder.build(),
            validate,
        })
    }

    pub fn with_config(config: ResolverConfig, validate: bool) -> Self {
        let mut builder =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default());
        configure_options(builder.options_mut(), validate);
        Self {
            resolver: builder.build(),
            validate,
        }
    }

    pub fn is_validating(&self) -> bool {
        self.validate
    }

    fn lookup_failed<T>(
        &self,
        query: RecordType,
        name: &str,
        no_records: bool,
        e: impl fmt::Display,
    ) -> Result<Vec<T>> {
        classify_failure(self.validate, query, name, no_records, e).map(|()| vec![])
    }

    fn check_proof(&self, query: RecordType, name: &str, lookup: &Lookup) -> Result<()> {
        if self.validate && lookup.records().iter().any(|r| r.proof().is_bogus()) {
            warn!("{} answer for {} failed DNSSEC validation", query, name);
            return Err(Error::DnssecFailure(format!("{} {}: bogus", query, name)));
        }
        Ok(())
    }
}

/// `Ok(())` means "answer with no records".
pub fn classify_failure(
    validate: bool,
    query: RecordType,
    name: &str,
    no_records: bool,
    e: impl fmt::Display,
) -> Result<()> {
    if no_records {
        debug!("{} lookup for {} returned nothing: {}", query, name, e);
        return Ok(());
    }
    if validate {
        warn!("{} lookup for {} has no validated answer: {}", query, name, e);
        return Err(Error::DnssecFailure(format!("{} {}: {}", query, name, e)));
    }
    Err(Error::DnsResolutionError(format!("{} {}: {}", query, name, e)))
}

fn parse_name(name: &str) -> Result<Name> {
    Name::from_utf8(name.trim()).map_err(|e| Error::ParseError(format!("{}: {}", name, e)))
}

fn name_to_host(name: &Name) -> String {
    name.to_utf8().trim_end_matches('.').to_string()
}

/// Keeps terminal (`S` flag) NAPTR records for SIP services and maps the
/// service field to a transport.
pub fn sip_naptr(flags: &[u8], services: &[u8], replacement: &str) -> Option<NaptrRecord> {
    if !flags.eq_ignore_ascii_case(b"s") {
        return None;
    }
    let transport = if services.eq_ignore_ascii_case(b"SIPS+D2T") {
        "TLS"
    } else if services.eq_ignore_ascii_case(b"SIP+D2T") {
        "TCP"
    } else if services.eq_ignore_ascii_case(b"SIP+D2U") {
        "UDP"
    } else {
        return None;
    };
    let replacement = replacement.trim_end_matches('.');
    if replacement.is_empty() {
        return None;
    }
    Some(NaptrRecord::new(transport, replacement))
}

/// Orders NAPTR records by `(order, preference)`.
pub fn sort_naptr(mut records: Vec<(u16, u16, NaptrRecord)>) -> Vec<NaptrRecord> {
    records.sort_by_key(|(order, preference, _)| (*order, *preference));
    records.into_iter().map(|(_, _, record)| record).collect()
}

/// Orders SRV records by priority, then by descending weight. A target of
/// `.` means the service is not offered and is dropped.
pub fn sort_srv(mut records: Vec<(u16, u16, SrvRecord)>) -> Vec<SrvRecord> {
    records.retain(|(_, _, record)| !record.target.is_empty() && record.target != ".");
    records.sort_by(|(pa, wa, _), (pb, wb, _)| pa.cmp(pb).then(wb.cmp(wa)));
    records.into_iter().map(|(_, _, record)| record).collect()
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn resolve_ip(&self, name: &str) -> Result<IpAddr> {
        if let Some(ip) = parse_literal_ip(name) {
            return Ok(ip);
        }
        let lookup = match self.resolver.lookup_ip(parse_name(name)?).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let no_records = e.is_no_records_found() || e.is_nx_domain();
                self.lookup_failed::<IpAddr>(RecordType::A, name, no_records, e)?;
                return Err(Error::UnknownHost(name.to_string()));
            }
        };
        self.check_proof(RecordType::A, name, lookup.as_lookup())?;
        lookup
            .iter()
            .next()
            .ok_or_else(|| Error::UnknownHost(name.to_string()))
    }

    async fn lookup_naptr(&self, domain: &str) -> Result<Vec<NaptrRecord>> {
        let name = parse_name(domain)?;
        let lookup = match self.resolver.lookup(name, RecordType::NAPTR).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let no_records = e.is_no_records_found() || e.is_nx_domain();
                return self.lookup_failed(RecordType::NAPTR, domain, no_records, e);
            }
        };
        self.check_proof(RecordType::NAPTR, domain, &lookup)?;
        let records = lookup
            .iter()
            .filter_map(|rdata| match rdata {
                RData::NAPTR(naptr) => sip_naptr(
                    naptr.flags(),
                    naptr.services(),
                    &name_to_host(naptr.replacement()),
                )
                .map(|record| (naptr.order(), naptr.preference(), record)),
                _ => None,
            })
            .collect();
        let records = sort_naptr(records);
        debug!("NAPTR {} -> {:?}", domain, records);
        Ok(records)
    }

    async fn lookup_srv_name(&self, name: &str) -> Result<Vec<SrvRecord>> {
        let query = parse_name(name)?;
        let lookup = match self.resolver.srv_lookup(query).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let no_records = e.is_no_records_found() || e.is_nx_domain();
                return self.lookup_failed(RecordType::SRV, name, no_records, e);
            }
        };
        self.check_proof(RecordType::SRV, name, lookup.as_lookup())?;
        let records = lookup
            .iter()
            .map(|srv| {
                (
                    srv.priority(),
                    srv.weight(),
                    SrvRecord::new(name_to_host(srv.target()), srv.port()),
                )
            })
            .collect();
        let records = sort_srv(records);
        debug!("SRV {} -> {:?}", name, records);
        Ok(records)
    }

    async fn lookup_addresses(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        if let Some(ip) = parse_literal_ip(host) {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }
        let name = parse_name(host)?;
        let lookup = match self.resolver.lookup_ip(name).await {
            Ok(lookup) => lookup,
            Err(e) => {
                let no_records = e.is_no_records_found() || e.is_nx_domain();
                return self.lookup_failed(RecordType::A, host, no_records, e);
            }
        };
        self.check_proof(RecordType::A, host, lookup.as_lookup())?;
        let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, port)).collect();
        debug!("A/AAAA {} -> {:?}", host, addrs);
        Ok(addrs)
    }
}
