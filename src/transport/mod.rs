use crate::{Error, Result};
use rsip::transport::Transport;

pub mod sip_addr;
pub use sip_addr::SipAddr;

pub const DEFAULT_SIP_PORT: u16 = 5060;
pub const DEFAULT_SIPS_PORT: u16 = 5061;

/// SRV services tried, in order, when a domain publishes no NAPTR records:
/// `(transport, service, proto)`.
pub const SRV_TRANSPORTS: [(Transport, &str, &str); 3] = [
    (Transport::Tls, "sips", "tcp"),
    (Transport::Tcp, "sip", "tcp"),
    (Transport::Udp, "sip", "udp"),
];

pub fn default_port(transport: &Transport) -> u16 {
    match transport {
        Transport::Tls | Transport::Wss => DEFAULT_SIPS_PORT,
        _ => DEFAULT_SIP_PORT,
    }
}

/// Canonical upper-case name, as used in outbound proxy strings.
pub fn transport_name(transport: &Transport) -> &'static str {
    match transport {
        Transport::Udp => "UDP",
        Transport::Tcp => "TCP",
        Transport::Tls => "TLS",
        Transport::Ws => "WS",
        Transport::Wss => "WSS",
        _ => "SCTP",
    }
}

/// Parses a configured transport. Only UDP, TCP and TLS carry SIP signaling
/// for proxy connections.
pub fn parse_transport(value: &str) -> Result<Transport> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("udp") {
        Ok(Transport::Udp)
    } else if value.eq_ignore_ascii_case("tcp") {
        Ok(Transport::Tcp)
    } else if value.eq_ignore_ascii_case("tls") {
        Ok(Transport::Tls)
    } else {
        Err(Error::ConfigurationError(format!(
            "unsupported transport: {}",
            value
        )))
    }
}

/// Maps a NAPTR transport flag: `TLS` and `TCP` (any case), UDP otherwise.
pub fn transport_from_naptr_flag(flag: &str) -> Transport {
    if flag.eq_ignore_ascii_case("tls") {
        Transport::Tls
    } else if flag.eq_ignore_ascii_case("tcp") {
        Transport::Tcp
    } else {
        Transport::Udp
    }
}
