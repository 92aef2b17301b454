//! In-process keyed mutual exclusion.
//!
//! Each key maps to a FIFO-fair async mutex, so operations sharing a key run
//! one at a time in arrival order while different keys never wait on each
//! other. Entries are dropped once nobody holds or waits on them.
//!
//! This only coordinates tasks inside one process. Several service
//! instances sharing a database need a storage-level or external lock with
//! the same acquire/release contract.

use crate::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

pub struct KeyedMutex<K> {
    slots: Slots<K>,
}

impl<K> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive ownership of `key`.
    ///
    /// Gives up with `ConcurrentOperation` if the key is not released within
    /// `timeout`. The holder itself is never interrupted.
    pub async fn acquire(&self, key: K, timeout: Duration) -> AppResult<KeyGuard<K>> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(KeyGuard {
                key,
                guard: Some(guard),
                slots: Arc::clone(&self.slots),
            }),
            Err(_) => {
                prune(&self.slots, &key);
                Err(AppError::ConcurrentOperation(format!(
                    "another {key:?} request is still running (waited {} ms)",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_locked(&self, key: &K) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|slot| slot.try_lock().is_err())
    }
}

/// Remove the slot for `key` if only the map still references it.
fn prune<K: Eq + Hash>(slots: &Slots<K>, key: &K) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
        slots.remove(key);
    }
}

/// Exclusive ownership of one key. Released on drop, on every exit path.
pub struct KeyGuard<K: Eq + Hash> {
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
    slots: Slots<K>,
}

impl<K: Eq + Hash> KeyGuard<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // release first so the strong count reflects only waiters
        drop(self.guard.take());
        prune(&self.slots, &self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn same_key_is_exclusive_and_ordered() {
        let locks = Arc::new(KeyedMutex::<&'static str>::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.acquire("alice", WAIT).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..5 {
            let locks = Arc::clone(&locks);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _g = locks.acquire("alice", WAIT).await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // let each task queue up before spawning the next one
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(order.lock().unwrap().is_empty());
        drop(first);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedMutex::new();
        let _a = locks.acquire(("u1", 1), WAIT).await.unwrap();
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(("u1", 2), WAIT)).await;
        assert!(b.is_ok());
        let c = tokio::time::timeout(Duration::from_millis(200), locks.acquire(("u2", 1), WAIT)).await;
        assert!(c.is_ok());
    }

    #[tokio::test]
    async fn timeout_surfaces_concurrent_operation() {
        let locks = KeyedMutex::new();
        let held = locks.acquire("bob", WAIT).await.unwrap();
        assert!(locks.is_locked(&"bob"));

        let err = locks
            .acquire("bob", Duration::from_millis(50))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::ConcurrentOperation(_)));
        assert!(err.is_retryable());

        drop(held);
        assert_eq!(locks.active_keys(), 0);
        assert!(locks.acquire("bob", WAIT).await.is_ok());
    }

    #[tokio::test]
    async fn released_even_when_holder_fails() {
        let locks = Arc::new(KeyedMutex::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let l = Arc::clone(&locks);
        let r = Arc::clone(&runs);
        let failed = tokio::spawn(async move {
            let _g = l.acquire("carol", WAIT).await.unwrap();
            r.fetch_add(1, Ordering::SeqCst);
            panic!("boom");
        })
        .await;
        assert!(failed.is_err());

        let _g = locks.acquire("carol", WAIT).await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
