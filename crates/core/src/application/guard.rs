// Concurrency Guard - per-queue mutual exclusion

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Keyed lock table: one async mutex per queue id.
///
/// Locks on different queue ids never contend. Entries are dropped once no
/// holder or waiter references them, so the table only grows with live contention.
///
/// Hold a guard across store calls only, never across a round trip to the chat platform.
#[derive(Default)]
pub struct QueueLocks {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

/// Exclusive access to one queue id. Released on drop.
#[derive(Debug)]
pub struct QueueLockGuard {
    queue_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl QueueLockGuard {
    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }
}

impl Drop for QueueLockGuard {
    fn drop(&mut self) {
        trace!(queue_id = %self.queue_id, "Released queue lock");
    }
}

impl QueueLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the queue id is free, then hold it
    pub async fn acquire(&self, queue_id: &str) -> QueueLockGuard {
        let slot = self.slot(queue_id);
        let guard = slot.lock_owned().await;
        trace!(queue_id = %queue_id, "Acquired queue lock");
        QueueLockGuard {
            queue_id: queue_id.to_string(),
            _guard: guard,
        }
    }

    /// Hold the queue id only if nobody else does
    pub fn try_acquire(&self, queue_id: &str) -> Option<QueueLockGuard> {
        let slot = self.slot(queue_id);
        slot.try_lock_owned().ok().map(|guard| QueueLockGuard {
            queue_id: queue_id.to_string(),
            _guard: guard,
        })
    }

    /// Number of queue ids with a live holder or waiter
    pub fn active_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|w| w.strong_count() > 0).count()
    }

    fn slot(&self, queue_id: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.retain(|_, weak| weak.strong_count() > 0);

        if let Some(existing) = slots.get(queue_id).and_then(Weak::upgrade) {
            return existing;
        }

        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(queue_id.to_string(), Arc::downgrade(&fresh));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_queue_is_exclusive() {
        let locks = QueueLocks::new();
        let held = locks.acquire("m1").await;
        assert!(locks.try_acquire("m1").is_none());
        drop(held);
        assert!(locks.try_acquire("m1").is_some());
    }

    #[test]
    fn test_waiter_is_pending_until_release() {
        let locks = QueueLocks::new();
        let held = locks.try_acquire("m1").unwrap();

        let mut waiter = tokio_test::task::spawn(locks.acquire("m1"));
        tokio_test::assert_pending!(waiter.poll());

        drop(held);
        assert!(waiter.is_woken());
        let guard = tokio_test::assert_ready!(waiter.poll());
        assert_eq!(guard.queue_id(), "m1");
    }

    #[tokio::test]
    async fn test_different_queues_do_not_block() {
        let locks = QueueLocks::new();
        let _a = locks.acquire("m1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("m2")).await;
        assert!(b.is_ok(), "lock on m2 should not wait for m1");
    }

    #[tokio::test]
    async fn test_entries_are_pruned_after_release() {
        let locks = QueueLocks::new();
        {
            let _a = locks.acquire("m1").await;
            let _b = locks.acquire("m2").await;
            assert_eq!(locks.active_count(), 2);
        }
        assert_eq!(locks.active_count(), 0);
    }

    #[tokio::test]
    async fn test_critical_sections_never_overlap() {
        let locks = Arc::new(QueueLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("shared").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
