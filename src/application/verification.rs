//! Per-client verification state.
//!
//! Tracks `UNVERIFIED → CHALLENGED → VERIFIED` for every client the gate
//! has escalated. A client with no record is `UNVERIFIED`, so well-behaved
//! clients never allocate an entry.

use crate::application::ports::{Clock, Storage};
use crate::domain::client::ClientIdentity;
use crate::domain::decision::ChallengeOutcome;
use crate::domain::verification::{VerificationRecord, VerificationStatus};
use std::sync::Arc;
use std::time::Duration;

/// Number of tracked clients in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub unverified: usize,
    pub challenged: usize,
    pub verified: usize,
}

/// Drives verification transitions over a status store.
///
/// Generic over the storage backend; in production this is
/// `Arc<ShardedStorage<ClientIdentity, VerificationRecord>>`. Every
/// transition runs inside the store's per-key lock, so concurrent
/// escalations of the same client apply once and never interleave.
#[derive(Debug, Clone)]
pub struct VerificationStateMachine<S>
where
    S: Storage<ClientIdentity, VerificationRecord> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
    verified_ttl: Option<Duration>,
}

impl<S> VerificationStateMachine<S>
where
    S: Storage<ClientIdentity, VerificationRecord> + Clone,
{
    /// Create a state machine over `storage`.
    ///
    /// With `verified_ttl` set, a VERIFIED client falls back to UNVERIFIED
    /// once that much time has passed since it was verified.
    pub fn new(storage: S, clock: Arc<dyn Clock>, verified_ttl: Option<Duration>) -> Self {
        Self {
            storage,
            clock,
            verified_ttl,
        }
    }

    /// Current status of `client`, after applying verification expiry.
    pub fn status(&self, client: &ClientIdentity) -> VerificationStatus {
        let Some(record) = self.storage.get_cloned(client) else {
            return VerificationStatus::Unverified;
        };

        match (record.status(), self.verified_ttl) {
            (VerificationStatus::Verified, Some(ttl)) => {
                let now = self.clock.now();
                if now.saturating_duration_since(record.since()) < ttl {
                    return VerificationStatus::Verified;
                }

                // Re-check under the entry lock; a concurrent caller may
                // have demoted it already.
                self.storage.with_entry_mut(
                    *client,
                    || VerificationRecord::new(now),
                    |record| {
                        if record.expire_verification(ttl, now) {
                            tracing::info!(client = %client, "verification expired");
                        }
                        record.status()
                    },
                )
            }
            (status, _) => status,
        }
    }

    /// Copy of the stored record, if any.
    pub fn record(&self, client: &ClientIdentity) -> Option<VerificationRecord> {
        self.storage.get_cloned(client)
    }

    /// Move `client` to CHALLENGED after an abuse signal.
    ///
    /// Returns `true` if this call performed the transition.
    pub fn escalate(&self, client: &ClientIdentity) -> bool {
        let now = self.clock.now();
        let changed = self.storage.with_entry_mut(
            *client,
            || VerificationRecord::new(now),
            |record| record.challenge(now),
        );

        if changed {
            tracing::info!(client = %client, "client challenged");
        }
        changed
    }

    /// Escalate `client` for crossing the block threshold.
    ///
    /// Returns `true` only for the first crossing since the client last
    /// verified; that caller is the one that suggests the block.
    pub fn flag_for_block(&self, client: &ClientIdentity) -> bool {
        let now = self.clock.now();
        let (challenged, first) = self.storage.with_entry_mut(
            *client,
            || VerificationRecord::new(now),
            |record| (record.challenge(now), record.mark_block_suggested()),
        );

        if challenged {
            tracing::info!(client = %client, "client challenged");
        }
        first
    }

    /// Apply a scored challenge response.
    ///
    /// Only a CHALLENGED client can move, and only on a correct answer.
    /// Returns `true` if the client became VERIFIED.
    pub fn apply_outcome(&self, client: &ClientIdentity, outcome: ChallengeOutcome) -> bool {
        // No record means UNVERIFIED, which no outcome can change.
        if self.storage.get_cloned(client).is_none() {
            return false;
        }

        let now = self.clock.now();
        let changed = self.storage.with_entry_mut(
            *client,
            || VerificationRecord::new(now),
            |record| record.answer(outcome, now),
        );

        if changed {
            tracing::info!(client = %client, "client verified");
        }
        changed
    }

    /// Tally of tracked clients by status.
    ///
    /// Expired verifications are counted as verified until they are next
    /// looked up.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        self.storage.for_each(|_, record| match record.status() {
            VerificationStatus::Unverified => counts.unverified += 1,
            VerificationStatus::Challenged => counts.challenged += 1,
            VerificationStatus::Verified => counts.verified += 1,
        });
        counts
    }

    /// Drop records that carry no information.
    ///
    /// UNVERIFIED records (left behind by expired verifications) and, when
    /// a TTL is configured, expired VERIFIED records are removed. Returns
    /// the number of records dropped.
    pub fn prune(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.verified_ttl;
        let before = self.storage.len();

        self.storage.retain(|_, record| match record.status() {
            VerificationStatus::Unverified => false,
            VerificationStatus::Challenged => true,
            VerificationStatus::Verified => match ttl {
                Some(ttl) => now.saturating_duration_since(record.since()) < ttl,
                None => true,
            },
        });

        before.saturating_sub(self.storage.len())
    }

    /// Number of clients with a stored record.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no client has a stored record.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Forget every client.
    pub fn clear(&self) {
        self.storage.clear();
    }
}
