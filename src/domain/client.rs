//! Client identity used to attribute requests.

use crate::domain::error::GateError;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// The attribution key for a client: its network address.
///
/// Two requests from the same address share counters and verification
/// status, even when they come from different hosts behind one NAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(IpAddr);

impl ClientIdentity {
    /// Create an identity from an IP address.
    pub fn new(addr: IpAddr) -> Self {
        Self(addr)
    }

    /// Parse a source address as reported by a transport.
    ///
    /// Accepts a bare IP (`203.0.113.7`, `::1`), a socket address
    /// (`203.0.113.7:51234`, `[::1]:8080`) and tolerates surrounding
    /// whitespace.
    ///
    /// # Errors
    /// Returns `GateError::InvalidClientIdentity` for empty or unparseable input.
    pub fn parse(raw: &str) -> Result<Self, GateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GateError::InvalidClientIdentity(
                "empty source address".to_string(),
            ));
        }

        if let Ok(ip) = trimmed.parse::<IpAddr>() {
            return Ok(Self(ip));
        }

        trimmed
            .parse::<SocketAddr>()
            .map(|sock| Self(sock.ip()))
            .map_err(|_| GateError::InvalidClientIdentity(trimmed.to_string()))
    }

    /// The underlying address.
    pub fn addr(&self) -> IpAddr {
        self.0
    }

    /// Counter-store key for the given namespace, e.g. `rate:203.0.113.7`.
    pub fn counter_key(&self, namespace: &str) -> String {
        format!("{}:{}", namespace, self.0)
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientIdentity {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(addr: IpAddr) -> Self {
        Self(addr)
    }
}

impl From<SocketAddr> for ClientIdentity {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.ip())
    }
}
