use super::transport_name;
use rsip::{transport::Transport, HostWithPort};
use std::{fmt, net::SocketAddr};

/// Resolved proxy address
///
/// `SipAddr` pairs a host/port with the transport a proxy candidate should be
/// contacted over. The resolver produces it from a socket address; the SIP
/// transport layer consumes it as an outbound route.
///
/// # Examples
///
/// ```rust
/// use sip_proxy_resolver::transport::SipAddr;
/// use rsip::transport::Transport;
/// use std::net::SocketAddr;
///
/// let socket_addr: SocketAddr = "192.0.2.10:5061".parse().unwrap();
/// let sip_addr = SipAddr::from_socket(Transport::Tls, socket_addr);
/// assert_eq!(sip_addr.to_string(), "TLS 192.0.2.10:5061");
///
/// let uri: rsip::Uri = (&sip_addr).into();
/// assert_eq!(uri.scheme, Some(rsip::Scheme::Sips));
/// ```
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct SipAddr {
    pub transport: Transport,
    pub addr: HostWithPort,
}

impl fmt::Display for SipAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", transport_name(&self.transport), self.addr)
    }
}

impl SipAddr {
    pub fn from_socket(transport: Transport, addr: SocketAddr) -> Self {
        SipAddr {
            transport,
            addr: HostWithPort {
                host: addr.ip().into(),
                port: Some(addr.port().into()),
            },
        }
    }
}

impl From<&SipAddr> for rsip::Uri {
    fn from(addr: &SipAddr) -> Self {
        let scheme = match addr.transport {
            Transport::Wss | Transport::Tls => rsip::Scheme::Sips,
            _ => rsip::Scheme::Sip,
        };
        let params = match addr.transport {
            Transport::Tcp => vec![rsip::Param::Transport(Transport::Tcp)],
            _ => vec![],
        };
        rsip::Uri {
            scheme: Some(scheme),
            host_with_port: addr.addr.clone(),
            params,
            ..Default::default()
        }
    }
}
