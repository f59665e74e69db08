use rsip::transport::Transport;
use sip_proxy_resolver::{
    dns::{Query, StaticLookup},
    AccountKey, Error, MemoryAccountConfig, ProxyConnection, ProxyConnectionBuilder, Result,
};
use std::{collections::HashSet, sync::Arc};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .ok();
}

fn example_dns() -> StaticLookup {
    StaticLookup::new()
        .with_naptr("example.com", "TLS", "_sips._tcp.example.com")
        .with_naptr("example.com", "TCP", "_sip._tcp.example.com")
        .with_srv("_sips._tcp.example.com", "sip1.example.com", 5061)
        .with_srv("_sips._tcp.example.com", "sip2.example.com", 5061)
        .with_srv("_sip._tcp.example.com", "sip1.example.com", 5060)
        .with_host("sip1.example.com", "192.0.2.1".parse().unwrap())
        .with_host("sip1.example.com", "2001:db8::1".parse().unwrap())
        .with_host("sip2.example.com", "192.0.2.2".parse().unwrap())
}

fn connection(user_id: &str, dns: Arc<StaticLookup>) -> Result<ProxyConnection> {
    let account = MemoryAccountConfig::new().with(AccountKey::UserId, user_id);
    ProxyConnectionBuilder::new()
        .with_account(Arc::new(account))
        .with_dns(dns)
        .build()
}

/// Simulates a transport layer that only reaches `reachable`.
async fn connect(
    proxy: &mut ProxyConnection,
    reachable: &str,
) -> Result<Option<(String, Transport)>> {
    proxy.reset()?;
    while proxy.next_address().await? {
        let addr = proxy.address().expect("address after next_address");
        if addr.to_string() == reachable {
            return Ok(Some((addr.to_string(), proxy.transport().clone())));
        }
    }
    Ok(None)
}

#[tokio::test]
async fn test_connect_sequence() -> Result<()> {
    init_tracing();
    let dns = Arc::new(example_dns());
    let mut proxy = connection("alice@example.com", dns.clone())?;

    let connected = connect(&mut proxy, "192.0.2.2:5061").await?;
    assert_eq!(
        connected,
        Some(("192.0.2.2:5061".to_string(), Transport::Tls))
    );
    assert_eq!(proxy.returned_addresses().len(), 3);

    // a later attempt starts over from the most preferred address
    let connected = connect(&mut proxy, "192.0.2.1:5060").await?;
    assert_eq!(
        connected,
        Some(("192.0.2.1:5060".to_string(), Transport::Tcp))
    );
    assert!(connect(&mut proxy, "192.0.2.99:5060").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_no_duplicates_per_attempt() -> Result<()> {
    init_tracing();
    let dns = Arc::new(example_dns());
    let mut proxy = connection("alice@example.com", dns)?;
    let mut seen = HashSet::new();
    while proxy.next_address().await? {
        let key = proxy.outbound_proxy_string().expect("outbound proxy string");
        assert!(seen.insert(key.clone()), "{} returned twice", key);
    }
    assert_eq!(seen.len(), 5);
    assert!(!proxy.next_address().await?);
    Ok(())
}

#[tokio::test]
async fn test_independent_connections_share_gateway() -> Result<()> {
    init_tracing();
    let dns = Arc::new(example_dns());
    let mut tasks = vec![];
    for _ in 0..4 {
        let mut proxy = connection("bob@example.com", dns.clone())?;
        tasks.push(tokio::spawn(async move {
            let mut addresses = vec![];
            while proxy.next_address().await? {
                addresses.extend(proxy.outbound_proxy_string());
            }
            Ok::<_, Error>(addresses)
        }));
    }
    let mut results = vec![];
    for task in tasks {
        results.push(task.await.expect("join")?);
    }
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(results[0][0], "192.0.2.1:5061/TLS");
    assert!(!dns.queries().iter().any(|q| matches!(q, Query::Srv { .. })));
    Ok(())
}
