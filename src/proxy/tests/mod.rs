use super::{ProxyConnection, ProxyConnectionBuilder};
use crate::{
    account::{AccountKey, MemoryAccountConfig},
    dns::StaticLookup,
    Result,
};
use std::{net::IpAddr, sync::Arc};


pub(super) fn ip(text: &str) -> IpAddr {
    text.parse().expect("ip literal")
}

pub(super) fn account(properties: &[(AccountKey, &str)]) -> Arc<MemoryAccountConfig> {
    let config = MemoryAccountConfig::new();
    for (key, value) in properties {
        config.set(*key, *value);
    }
    Arc::new(config)
}

pub(super) fn build_proxy(
    account: Arc<MemoryAccountConfig>,
    dns: Arc<StaticLookup>,
) -> Result<ProxyConnection> {
    ProxyConnectionBuilder::new()
        .with_account(account)
        .with_dns(dns)
        .build()
}

/// Drains the connection, returning every `ip:port/TRANSPORT` in order.
pub(super) async fn drain(proxy: &mut ProxyConnection) -> Result<Vec<String>> {
    let mut addresses = vec![];
    while proxy.next_address().await? {
        addresses.push(
            proxy
                .outbound_proxy_string()
                .expect("outbound proxy string after next_address"),
        );
    }
    Ok(addresses)
}
