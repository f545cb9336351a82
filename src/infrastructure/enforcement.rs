//! Enforcement adapters.
//!
//! The gate never blocks traffic at the network layer itself; it hands a
//! suggestion to an `Enforcer`. These adapters record the suggestion or
//! drop it. Wiring it to a real firewall is left to the deployment.

use crate::application::ports::Enforcer;
use crate::domain::client::ClientIdentity;
use crate::domain::error::EnforcementError;
use std::net::IpAddr;

/// Logs the firewall rule that would block the client, at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEnforcer;

impl TracingEnforcer {
    /// The rule suggested for `client`.
    pub fn suggested_rule(client: &ClientIdentity) -> String {
        let tool = match client.addr() {
            IpAddr::V4(_) => "iptables",
            IpAddr::V6(_) => "ip6tables",
        };
        format!("{} -A INPUT -p udp -s {} -j DROP", tool, client)
    }
}

impl Enforcer for TracingEnforcer {
    fn block(&self, client: &ClientIdentity) -> Result<(), EnforcementError> {
        tracing::warn!(
            client = %client,
            rule = %Self::suggested_rule(client),
            "network block suggested"
        );
        Ok(())
    }
}

/// Ignores block suggestions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnforcer;

impl Enforcer for NoopEnforcer {
    fn block(&self, _client: &ClientIdentity) -> Result<(), EnforcementError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_rule() {
        let v4 = ClientIdentity::parse("203.0.113.7").unwrap();
        assert_eq!(
            TracingEnforcer::suggested_rule(&v4),
            "iptables -A INPUT -p udp -s 203.0.113.7 -j DROP"
        );

        let v6 = ClientIdentity::parse("2001:db8::1").unwrap();
        assert_eq!(
            TracingEnforcer::suggested_rule(&v6),
            "ip6tables -A INPUT -p udp -s 2001:db8::1 -j DROP"
        );
    }

    #[test]
    fn test_adapters_never_fail() {
        let client = ClientIdentity::parse("203.0.113.7").unwrap();
        assert!(TracingEnforcer.block(&client).is_ok());
        assert!(NoopEnforcer.block(&client).is_ok());
    }
}
