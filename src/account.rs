use crate::{Error, Result};
use std::{collections::HashMap, fmt, str::FromStr, sync::RwLock};
use tracing::debug;

/// Account properties read by the proxy resolver.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AccountKey {
    UserId,
    ServerAddress,
    ProxyAddress,
    ProxyPort,
    PreferredTransport,
    ProxyAutoConfig,
}

impl AccountKey {
    pub const ALL: [AccountKey; 6] = [
        AccountKey::UserId,
        AccountKey::ServerAddress,
        AccountKey::ProxyAddress,
        AccountKey::ProxyPort,
        AccountKey::PreferredTransport,
        AccountKey::ProxyAutoConfig,
    ];

    /// Stable property name, as found in stored account property lists.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKey::UserId => "USER_ID",
            AccountKey::ServerAddress => "SERVER_ADDRESS",
            AccountKey::ProxyAddress => "PROXY_ADDRESS",
            AccountKey::ProxyPort => "PROXY_PORT",
            AccountKey::PreferredTransport => "PREFERRED_TRANSPORT",
            AccountKey::ProxyAutoConfig => "PROXY_AUTO_CONFIG",
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AccountKey::ALL
            .iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| Error::ConfigurationError(format!("unknown account property: {}", s)))
    }
}

/// Read-only view of a SIP account's configuration.
///
/// The resolver reads through this trait at construction and again on every
/// `reset()`, so implementations may reflect configuration changes.
pub trait AccountConfig: Send + Sync {
    fn get(&self, key: AccountKey) -> Option<String>;

    /// Returns the trimmed value, treating blank strings as unset.
    fn get_non_empty(&self, key: AccountKey) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, key: AccountKey, default: bool) -> bool {
        match self.get_non_empty(key) {
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => {
                debug!("ignoring non-boolean {} value: {}", key, v);
                default
            }
            None => default,
        }
    }
}

/// In-memory account store.
#[derive(Debug, Default)]
pub struct MemoryAccountConfig {
    values: RwLock<HashMap<AccountKey, String>>,
}

impl MemoryAccountConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from `(property name, value)` pairs.
    pub fn from_properties<'a, I>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let config = Self::new();
        for (name, value) in properties {
            config.set(name.parse()?, value);
        }
        Ok(config)
    }

    pub fn with(self, key: AccountKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: AccountKey, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value.into());
    }

    pub fn remove(&self, key: AccountKey) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key)
    }
}

impl AccountConfig for MemoryAccountConfig {
    fn get(&self, key: AccountKey) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }
}

/// Extracts the domain from a user ID such as `alice@example.com` or
/// `sip:alice@example.com:5070`. Returns `None` when there is no `@`.
pub fn server_from_user_id(user_id: &str) -> Option<String> {
    let user_id = user_id.trim();
    if !user_id.contains('@') {
        return None;
    }
    let uri_text = if user_id.starts_with("sip:") || user_id.starts_with("sips:") {
        user_id.to_string()
    } else {
        format!("sip:{}", user_id)
    };
    match rsip::Uri::try_from(uri_text.as_str()) {
        Ok(uri) => {
            let host = uri.host_with_port.host.to_string();
            Some(host.trim_start_matches('[').trim_end_matches(']').to_string())
                .filter(|h| !h.is_empty())
        }
        Err(e) => {
            debug!("user id {} is not a SIP URI ({}), splitting at '@'", user_id, e);
            user_id
                .rsplit('@')
                .next()
                .map(|host| host.split([';', '>']).next().unwrap_or_default().to_string())
                .filter(|h| !h.is_empty())
        }
    }
}
