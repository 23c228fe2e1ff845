/// Outbound network identities (proxy address + protocol)
use crate::{ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proxy protocol spoken by an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Socks5,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "socks5" => Ok(Self::Socks5),
            _ => Err(ValidationError::UnknownProtocol(s.to_string())),
        }
    }
}

/// A single proxy identity tracked by the pool
///
/// Identities are keyed by `address`. Callers only ever see copies, so
/// mutating a returned `Identity` has no effect on the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// `host:port` of the proxy
    pub address: String,

    /// Protocol used to talk to the proxy
    pub protocol: Protocol,

    /// Result of the liveness probe performed when the identity was added
    pub valid: bool,

    /// When the identity was last selected for a cycle
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates a never-used identity
    pub fn new(address: impl Into<String>, protocol: Protocol, valid: bool) -> Self {
        Self {
            address: address.into(),
            protocol,
            valid,
            last_used_at: None,
        }
    }

    /// Proxy URL suitable for an HTTP client, e.g. `socks5://1.2.3.4:1080`
    pub fn proxy_url(&self) -> String {
        proxy_url(&self.address, self.protocol)
    }
}

/// Formats the proxy URL for an address/protocol pair
pub fn proxy_url(address: &str, protocol: Protocol) -> String {
    format!("{}://{}", protocol, address)
}

/// Validates a `host:port` proxy address
///
/// The host must be non-empty and contain only alphanumerics, dots and
/// hyphens; the port must be a non-zero decimal number.
pub fn validate_address(address: &str) -> ValidationResult<()> {
    let malformed = || ValidationError::MalformedAddress(address.to_string());

    let (host, port) = address.rsplit_once(':').ok_or_else(malformed)?;

    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(malformed());
    }

    if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    match port.parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(malformed()),
    }
}
