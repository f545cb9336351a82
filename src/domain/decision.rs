//! Decisions produced by each stage of the pipeline.

use std::fmt;

/// Result of the short-window rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Post-increment count is within the configured limit
    WithinLimit,
    /// Post-increment count exceeds the configured limit
    Exceeded,
}

impl RateDecision {
    /// Check if this decision is Exceeded.
    pub fn is_exceeded(&self) -> bool {
        matches!(self, RateDecision::Exceeded)
    }
}

/// Result of the long-horizon flood check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodDecision {
    /// Volume is below the flood threshold
    Normal,
    /// Volume exceeds the flood threshold
    Flood,
}

impl FloodDecision {
    /// Check if this decision is Flood.
    pub fn is_flood(&self) -> bool {
        matches!(self, FloodDecision::Flood)
    }
}

/// Result of scoring a challenge response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// The response satisfied the challenge policy
    Correct,
    /// The response was wrong or malformed
    Incorrect,
}

/// The sole output of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdmissionVerdict {
    /// Serve the request normally
    Allow,
    /// Route the client to the verification interaction first
    Challenge,
    /// Reject the request
    Block,
}

impl AdmissionVerdict {
    /// Check if this verdict is Allow.
    pub fn is_allow(&self) -> bool {
        matches!(self, AdmissionVerdict::Allow)
    }

    /// Check if this verdict is Challenge.
    pub fn is_challenge(&self) -> bool {
        matches!(self, AdmissionVerdict::Challenge)
    }

    /// Check if this verdict is Block.
    pub fn is_block(&self) -> bool {
        matches!(self, AdmissionVerdict::Block)
    }
}

impl fmt::Display for AdmissionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdmissionVerdict::Allow => "allow",
            AdmissionVerdict::Challenge => "challenge",
            AdmissionVerdict::Block => "block",
        };
        f.write_str(s)
    }
}

/// Why the gate reached its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionReason {
    /// Client already passed a challenge
    Verified,
    /// Flood detector fired on this request
    Flood,
    /// Rate limiter fired on this request
    RateLimited,
    /// Client is challenged and has not answered correctly yet
    AwaitingChallenge,
    /// No check fired
    WithinLimits,
    /// Counter store failed or circuit is open; no abuse assumed
    FailOpen,
    /// Flood volume crossed the block threshold
    Blocked,
    /// Source address missing or unparseable
    UnidentifiedClient,
}

/// Verdict together with the reason that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// What the caller should do with the request
    pub verdict: AdmissionVerdict,
    /// Which stage decided
    pub reason: DecisionReason,
}

impl Decision {
    pub(crate) fn new(verdict: AdmissionVerdict, reason: DecisionReason) -> Self {
        Self { verdict, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_predicates() {
        assert!(AdmissionVerdict::Allow.is_allow());
        assert!(AdmissionVerdict::Challenge.is_challenge());
        assert!(AdmissionVerdict::Block.is_block());
        assert!(!AdmissionVerdict::Block.is_allow());
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(AdmissionVerdict::Challenge.to_string(), "challenge");
    }
}
