//! Audit events handed to the logging collaborator.

use crate::domain::client::ClientIdentity;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Longest raw source address kept in an audit event.
pub const MAX_RAW_SOURCE_LEN: usize = 64;

/// Who sent an audited request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditSource {
    /// A parsed client address
    Client(ClientIdentity),
    /// A source address that could not be parsed, kept verbatim (truncated
    /// to [`MAX_RAW_SOURCE_LEN`] bytes)
    Unidentified(String),
}

impl AuditSource {
    /// Source for an address that failed to parse.
    pub fn unidentified(raw: &str) -> Self {
        let mut end = raw.len().min(MAX_RAW_SOURCE_LEN);
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        AuditSource::Unidentified(raw[..end].to_string())
    }

    /// The parsed client, if there is one.
    pub fn client(&self) -> Option<&ClientIdentity> {
        match self {
            AuditSource::Client(client) => Some(client),
            AuditSource::Unidentified(_) => None,
        }
    }
}

impl From<ClientIdentity> for AuditSource {
    fn from(client: ClientIdentity) -> Self {
        AuditSource::Client(client)
    }
}

impl fmt::Display for AuditSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditSource::Client(client) => write!(f, "{}", client),
            AuditSource::Unidentified(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for AuditSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One inbound request, recorded write-only.
///
/// Serializes as `{"ip":"203.0.113.7","timestamp":"2024-05-01T12:00:00Z"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Who sent the request
    #[serde(rename = "ip")]
    pub source: AuditSource,
    /// Wall-clock arrival time
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event for a request arriving at `timestamp`.
    pub fn new(source: impl Into<AuditSource>, timestamp: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            timestamp,
        }
    }

    /// Create an event stamped with the current wall-clock time.
    pub fn now(source: impl Into<AuditSource>) -> Self {
        Self::new(source, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_json_shape() {
        let client = ClientIdentity::parse("203.0.113.7").unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = AuditEvent::new(client, ts);

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"ip":"203.0.113.7","timestamp":"2024-05-01T12:00:00Z"}"#
        );
    }

    #[test]
    fn test_unidentified_source_kept_verbatim() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = AuditEvent::new(AuditSource::unidentified("not an \"ip\""), ts);

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"ip":"not an \"ip\"","timestamp":"2024-05-01T12:00:00Z"}"#
        );
        assert_eq!(event.source.client(), None);
    }

    #[test]
    fn test_unidentified_source_truncated_on_char_boundary() {
        let raw = "é".repeat(MAX_RAW_SOURCE_LEN);
        let source = AuditSource::unidentified(&raw);

        let AuditSource::Unidentified(kept) = source else {
            panic!("expected an unidentified source");
        };
        assert!(kept.len() <= MAX_RAW_SOURCE_LEN);
        assert_eq!(kept, "é".repeat(MAX_RAW_SOURCE_LEN / 2));
    }
}
