//! Ports the gate is written against.
//!
//! Everything with I/O or wall-clock time sits behind one of these traits;
//! `crate::infrastructure` holds the adapters and the test doubles.

use crate::domain::audit::AuditEvent;
use crate::domain::client::ClientIdentity;
use crate::domain::error::{AuditError, EnforcementError, StoreError};
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Source of time for counter windows, breaker recovery and
/// verification expiry.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Port for the shared, expiring request counters.
///
/// Implementations must make `increment` atomic per key: concurrent
/// increments from many request workers serialize without lost updates.
/// Callers never add their own locking around it.
///
/// Every call must return within a bounded time. A store that cannot answer
/// returns `StoreError`, and the caller fails open.
pub trait CounterStore: Send + Sync + Debug {
    /// Bump the counter for `key` and return the post-increment count.
    ///
    /// If the key is absent or expired, it starts at 1 and expires after
    /// `window`. An existing key keeps its original expiry.
    fn increment(&self, key: &str, window: Duration) -> Result<u64, StoreError>;

    /// Read the current count, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<u64>, StoreError>;

    /// Drop expired records and return how many went.
    ///
    /// Stores whose backend expires keys on its own keep the default.
    fn purge_expired(&self) -> usize {
        0
    }
}

/// Port for concurrent key-value storage with per-key read-modify-write.
///
/// Used for the verification status map. `with_entry_mut` holds the
/// entry exclusively for the duration of the accessor, so a transition is
/// never observed half-applied.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Run `accessor` on the entry for `key`, inserting `factory()` first
    /// if there is none. Returns what the accessor returns.
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Read a copy of an entry without creating it.
    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool;

    /// Forget every client.
    fn clear(&self);

    /// Visit every entry. Must not call back into the same storage.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Keep only the entries for which `f` returns true.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for the write-only audit log.
///
/// Best effort: the gate logs and ignores any error returned here.
pub trait AuditSink: Send + Sync + Debug {
    /// Append one event.
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Port for the network-level enforcement collaborator.
///
/// The gate only calls this to *suggest* a block. What happens next
/// (firewall rule, ticket, nothing) is up to the adapter.
pub trait Enforcer: Send + Sync + Debug {
    /// Suggest blocking `client`.
    fn block(&self, client: &ClientIdentity) -> Result<(), EnforcementError>;
}
