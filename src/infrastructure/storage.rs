//! In-process status store.
//!
//! Concurrent, sharded map used for per-client verification records.

use crate::application::ports::Storage;
use ahash::RandomState;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Thread-safe sharded storage backed by DashMap.
///
/// Reads take a shard read lock; `with_entry_mut` holds the entry's shard
/// write lock for the duration of the accessor, which is what makes
/// verification transitions atomic per client.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    map: DashMap<K, V, RandomState>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            map: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Create an empty store sized for roughly `capacity` clients.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(capacity, RandomState::new()),
        }
    }

    /// Insert or overwrite a value.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    /// Remove a key and return its value.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, v)| v)
    }

    /// Check if a key exists.
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        let mut value_ref = self.map.entry(key).or_insert_with(factory);
        accessor(&mut value_ref)
    }

    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for entry in self.map.iter() {
            f(entry.key(), entry.value());
        }
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

// Lets gate clones share one map
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R,
    {
        (**self).with_entry_mut(key, factory, accessor)
    }

    fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        (**self).get_cloned(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V),
    {
        (**self).for_each(f)
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::ClientIdentity;
    use crate::domain::verification::{VerificationRecord, VerificationStatus};
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_entry_created_by_factory_once() {
        let storage: ShardedStorage<&str, u32> = ShardedStorage::new();

        let first = storage.with_entry_mut("a", || 10, |v| {
            *v += 1;
            *v
        });
        let second = storage.with_entry_mut("a", || 100, |v| {
            *v += 1;
            *v
        });

        assert_eq!(first, 11);
        assert_eq!(second, 12);
        assert_eq!(storage.get_cloned(&"a"), Some(12));
        assert_eq!(storage.get_cloned(&"b"), None);
    }

    #[test]
    fn test_insert_remove_clear() {
        let storage = ShardedStorage::with_capacity(4);
        storage.insert("a", 1);
        storage.insert("b", 2);
        assert!(storage.contains_key(&"a"));
        assert_eq!(storage.len(), 2);

        assert_eq!(storage.remove(&"a"), Some(1));
        assert!(!storage.contains_key(&"a"));

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_retain_and_for_each() {
        let storage = ShardedStorage::new();
        for i in 0..10u32 {
            storage.insert(i, i * 10);
        }

        storage.retain(|k, _| k % 2 == 0);

        let mut sum = 0;
        storage.for_each(|_, v| sum += *v);
        assert_eq!(sum, 200);
    }

    #[test]
    fn test_concurrent_transitions_on_one_key() {
        let storage: Arc<ShardedStorage<ClientIdentity, VerificationRecord>> =
            Arc::new(ShardedStorage::new());
        let client = ClientIdentity::parse("192.0.2.44").unwrap();
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                thread::spawn(move || {
                    storage.with_entry_mut(
                        client,
                        || VerificationRecord::new(now),
                        |record| record.challenge(now),
                    )
                })
            })
            .collect();

        let changed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| *c)
            .count();

        assert_eq!(changed, 1);
        assert_eq!(
            storage.get_cloned(&client).map(|r| r.status()),
            Some(VerificationStatus::Challenged)
        );
    }
}
