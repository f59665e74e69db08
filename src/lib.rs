// RFC 3263 SIP proxy address resolution

pub mod account;
pub mod dns;
pub mod error;
pub mod proxy;
pub mod transport;

pub use account::{AccountConfig, AccountKey, MemoryAccountConfig};
pub use dns::DnsLookup;
pub use error::Error;
pub use proxy::{ProxyConnection, ProxyConnectionBuilder};

pub type Result<T> = std::result::Result<T, Error>;
