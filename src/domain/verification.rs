//! Verification status and its transitions.
//!
//! ```text
//!   UNVERIFIED ──abuse signal──▶ CHALLENGED ──correct response──▶ VERIFIED
//!                                 │    ▲
//!                                 └────┘ incorrect response
//! ```
//!
//! There is no blocked state here. Hard blocking is an external action the
//! gate may suggest, never a status this machine tracks.

use crate::domain::decision::ChallengeOutcome;
use std::fmt;
use std::time::{Duration, Instant};

/// Where a client stands with respect to the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerificationStatus {
    /// First contact, not throttled yet
    #[default]
    Unverified,
    /// Abuse detected; must answer the challenge
    Challenged,
    /// Answered the challenge correctly
    Verified,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Unverified => "unverified",
            VerificationStatus::Challenged => "challenged",
            VerificationStatus::Verified => "verified",
        };
        f.write_str(s)
    }
}

/// Per-client status plus the instant of its last transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationRecord {
    status: VerificationStatus,
    since: Instant,
    /// A network block has been suggested since the client last verified
    block_suggested: bool,
}

impl VerificationRecord {
    /// A fresh record for a client seen for the first time.
    pub fn new(now: Instant) -> Self {
        Self {
            status: VerificationStatus::Unverified,
            since: now,
            block_suggested: false,
        }
    }

    /// Current status.
    pub fn status(&self) -> VerificationStatus {
        self.status
    }

    /// When the current status was entered.
    pub fn since(&self) -> Instant {
        self.since
    }

    /// Whether a network block was already suggested for this client.
    pub fn block_suggested(&self) -> bool {
        self.block_suggested
    }

    /// Note that a network block is being suggested.
    ///
    /// Returns `true` the first time only, so the suggestion goes out once
    /// however many requests arrive above the block threshold.
    pub fn mark_block_suggested(&mut self) -> bool {
        !std::mem::replace(&mut self.block_suggested, true)
    }

    /// Move `UNVERIFIED → CHALLENGED` after an abuse signal.
    ///
    /// Idempotent: a client that is already challenged stays challenged and
    /// keeps its original `since`. A verified client is left alone.
    ///
    /// Returns `true` only when the status actually changed.
    pub fn challenge(&mut self, now: Instant) -> bool {
        match self.status {
            VerificationStatus::Unverified => {
                self.status = VerificationStatus::Challenged;
                self.since = now;
                true
            }
            VerificationStatus::Challenged | VerificationStatus::Verified => false,
        }
    }

    /// Apply a scored challenge response.
    ///
    /// Only a challenged client can become verified. An incorrect answer
    /// leaves a challenged client challenged, with no lockout. Verifying
    /// clears the block suggestion.
    ///
    /// Returns `true` only when the status actually changed.
    pub fn answer(&mut self, outcome: ChallengeOutcome, now: Instant) -> bool {
        match (self.status, outcome) {
            (VerificationStatus::Challenged, ChallengeOutcome::Correct) => {
                self.status = VerificationStatus::Verified;
                self.since = now;
                self.block_suggested = false;
                true
            }
            _ => false,
        }
    }

    /// Demote a verified client back to `UNVERIFIED` once `ttl` has elapsed.
    ///
    /// Returns `true` only when the record was demoted.
    pub fn expire_verification(&mut self, ttl: Duration, now: Instant) -> bool {
        if self.status == VerificationStatus::Verified
            && now.saturating_duration_since(self.since) >= ttl
        {
            self.status = VerificationStatus::Unverified;
            self.since = now;
            return true;
        }
        false
    }
}
