use crate::dns::{
    is_literal_ip, validate_name, DnsLookup, NaptrRecord, Query, SrvRecord, StaticLookup,
};
use crate::{Error, Result};
use std::net::{IpAddr, SocketAddr};

#[test]
fn test_is_literal_ip() {
    assert!(is_literal_ip("203.0.113.5"));
    assert!(is_literal_ip("2001:db8::1"));
    assert!(is_literal_ip("[2001:db8::1]"));
    assert!(!is_literal_ip("example.com"));
    assert!(!is_literal_ip("203.0.113"));
    assert!(!is_literal_ip(""));
}

#[test]
fn test_validate_name() {
    assert!(validate_name("example.com").is_ok());
    assert!(validate_name("_sip._udp.example.com.").is_ok());
    assert!(matches!(validate_name("bad..example.com"), Err(Error::ParseError(_))));
    assert!(matches!(validate_name("has space.com"), Err(Error::ParseError(_))));
    assert!(matches!(validate_name(""), Err(Error::ParseError(_))));
    assert!(validate_name(&format!("{}.com", "a".repeat(64))).is_err());
}

#[tokio::test]
async fn test_static_records() -> Result<()> {
    let ip: IpAddr = "192.0.2.10".parse().unwrap();
    let dns = StaticLookup::new()
        .with_naptr("Example.COM.", "TLS", "_sips._tcp.example.com")
        .with_srv("_sips._tcp.example.com", "sip1.example.com", 5061)
        .with_host("sip1.example.com", ip);

    assert_eq!(
        dns.lookup_naptr("example.com").await?,
        vec![NaptrRecord::new("TLS", "_sips._tcp.example.com")]
    );
    assert_eq!(
        dns.lookup_srv("sips", "tcp", "example.com").await?,
        vec![SrvRecord::new("sip1.example.com", 5061)]
    );
    assert_eq!(
        dns.lookup_addresses("sip1.example.com", 5061).await?,
        vec![SocketAddr::new(ip, 5061)]
    );
    assert!(dns.lookup_addresses("nowhere.example.com", 5060).await?.is_empty());
    assert_eq!(dns.resolve_ip("sip1.example.com").await?, ip);
    assert!(matches!(
        dns.resolve_ip("nowhere.example.com").await,
        Err(Error::UnknownHost(_))
    ));

    let queries = dns.queries();
    assert_eq!(queries[0], Query::Naptr("example.com".to_string()));
    assert_eq!(
        queries[1],
        Query::Srv {
            service: "sips".to_string(),
            proto: "tcp".to_string(),
            domain: "example.com".to_string(),
        }
    );
    dns.clear_queries();
    assert!(dns.queries().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_static_failures() {
    let dns = StaticLookup::new().with_failure(
        "example.com",
        Error::DnssecFailure("bogus signature".to_string()),
    );
    assert!(matches!(
        dns.lookup_naptr("example.com").await,
        Err(Error::DnssecFailure(_))
    ));
    assert!(matches!(
        dns.lookup_addresses("bad..name", 5060).await,
        Err(Error::ParseError(_))
    ));
    // literals never hit the table
    assert_eq!(
        dns.lookup_addresses("[2001:db8::1]", 5061).await.unwrap(),
        vec!["[2001:db8::1]:5061".parse::<SocketAddr>().unwrap()]
    );
}
