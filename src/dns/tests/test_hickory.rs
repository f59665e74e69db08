use crate::dns::hickory::{classify_failure, configure_options, sip_naptr, sort_naptr, sort_srv};
use crate::dns::{NaptrRecord, SrvRecord};
use crate::Error;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverOpts},
    proto::rr::RecordType,
};

#[test]
fn test_sip_naptr_services() {
    assert_eq!(
        sip_naptr(b"s", b"SIPS+D2T", "_sips._tcp.example.com."),
        Some(NaptrRecord::new("TLS", "_sips._tcp.example.com"))
    );
    assert_eq!(
        sip_naptr(b"S", b"sip+d2t", "_sip._tcp.example.com"),
        Some(NaptrRecord::new("TCP", "_sip._tcp.example.com"))
    );
    assert_eq!(
        sip_naptr(b"S", b"SIP+D2U", "_sip._udp.example.com"),
        Some(NaptrRecord::new("UDP", "_sip._udp.example.com"))
    );
    // non-terminal, foreign service and empty replacement are skipped
    assert_eq!(sip_naptr(b"", b"SIP+D2U", "_sip._udp.example.com"), None);
    assert_eq!(sip_naptr(b"s", b"E2U+sip", "_sip._udp.example.com"), None);
    assert_eq!(sip_naptr(b"s", b"SIP+D2U", "."), None);
}

#[test]
fn test_sort_naptr() {
    let sorted = sort_naptr(vec![
        (20, 10, NaptrRecord::new("UDP", "_sip._udp.example.com")),
        (10, 20, NaptrRecord::new("TCP", "_sip._tcp.example.com")),
        (10, 10, NaptrRecord::new("TLS", "_sips._tcp.example.com")),
    ]);
    let transports: Vec<_> = sorted.iter().map(|r| r.transport.as_str()).collect();
    assert_eq!(transports, vec!["TLS", "TCP", "UDP"]);
}

#[test]
fn test_sort_srv() {
    let sorted = sort_srv(vec![
        (20, 0, SrvRecord::new("backup.example.com", 5060)),
        (10, 10, SrvRecord::new("light.example.com", 5060)),
        (10, 90, SrvRecord::new("heavy.example.com", 5060)),
        (0, 0, SrvRecord::new(".", 0)),
    ]);
    let targets: Vec<_> = sorted.iter().map(|r| r.target.as_str()).collect();
    assert_eq!(
        targets,
        vec!["heavy.example.com", "light.example.com", "backup.example.com"]
    );
}

#[test]
fn test_resolver_asks_for_a_and_aaaa() {
    let mut opts = ResolverOpts::default();
    assert_ne!(opts.ip_strategy, LookupIpStrategy::Ipv4AndIpv6);
    configure_options(&mut opts, false);
    assert_eq!(opts.ip_strategy, LookupIpStrategy::Ipv4AndIpv6);
    assert!(!opts.validate);

    configure_options(&mut opts, true);
    assert_eq!(opts.ip_strategy, LookupIpStrategy::Ipv4AndIpv6);
    assert!(opts.validate);
}

#[test]
fn test_classify_failure() {
    // NXDOMAIN and empty answers are "no records" either way
    assert_eq!(
        classify_failure(false, RecordType::NAPTR, "example.com", true, "no records"),
        Ok(())
    );
    assert_eq!(
        classify_failure(true, RecordType::NAPTR, "example.com", true, "no records"),
        Ok(())
    );

    // SERVFAIL is never an empty answer
    assert!(matches!(
        classify_failure(false, RecordType::NAPTR, "example.com", false, "SERVFAIL"),
        Err(Error::DnsResolutionError(_))
    ));
    let name = "_sip._udp.example.com";
    let err = classify_failure(true, RecordType::SRV, name, false, "SERVFAIL").unwrap_err();
    assert!(err.is_dnssec_failure());
}
