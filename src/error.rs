use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("malformed name: {0}")]
    ParseError(String),

    #[error("DNSSEC validation failed: {0}")]
    DnssecFailure(String),

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("DNS resolution error: {0}")]
    DnsResolutionError(String),
}

impl Error {
    /// DNSSEC failures must reach the caller of `next_address`.
    pub fn is_dnssec_failure(&self) -> bool {
        matches!(self, Error::DnssecFailure(_))
    }
}
