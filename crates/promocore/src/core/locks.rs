use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async mutexes.
///
/// Serializes read-modify-write cycles on one record (a user, an item)
/// while leaving other keys free. Guards are owned so they can be held
/// across `.await` points.
pub struct KeyedLocks<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        // Clone the Arc out first: the DashMap shard guard must not live
        // across the await below.
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Locks two keys in a stable order so concurrent callers locking the
    /// same pair can't deadlock. Locking the same key twice returns one guard.
    pub async fn lock_pair(&self, a: &K, b: &K) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>)
    where
        K: Ord,
    {
        if a == b {
            return (self.lock(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.lock(first).await;
        let second = self.lock(second).await;
        (first, Some(second))
    }

    /// Drops lock entries nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<i64>::new());
        let guard = locks.lock(&1).await;

        let locks_clone = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _guard = locks_clone.lock(&1).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<i64>::new();
        let _a = locks.lock(&1).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&2))
            .await
            .expect("other key must not block");
    }

    #[tokio::test]
    async fn test_lock_pair_same_key() {
        let locks = KeyedLocks::<i64>::new();
        let (_first, second) = locks.lock_pair(&5, &5).await;
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = KeyedLocks::<String>::new();
        let held = locks.lock(&"a".to_string()).await;
        drop(locks.lock(&"b".to_string()).await);
        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }
}
