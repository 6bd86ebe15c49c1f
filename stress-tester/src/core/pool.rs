//! Process pool
//!
//! Every membership read and write goes through one lock. Callers take a
//! point-in-time copy under the lock and touch individual workers only after
//! it is released.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::worker::Worker;

/// Currently registered workers, ordered by sequence number
#[derive(Debug, Default)]
pub struct ProcessPool {
    workers: Mutex<BTreeMap<u64, Arc<Worker>>>,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, worker: Arc<Worker>) {
        self.workers.lock().await.insert(worker.seq(), worker);
    }

    /// Remove the worker with `seq`; removing an absent worker is a no-op
    pub async fn unregister_if_present(&self, seq: u64) -> Option<Arc<Worker>> {
        self.workers.lock().await.remove(&seq)
    }

    pub async fn snapshot(&self) -> Vec<Arc<Worker>> {
        self.workers.lock().await.values().cloned().collect()
    }

    /// Copy and clear the membership in one locked step
    pub async fn drain_all(&self) -> Vec<Arc<Worker>> {
        let drained = std::mem::take(&mut *self.workers.lock().await);
        drained.into_values().collect()
    }

    pub async fn len(&self) -> usize {
        self.workers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::test_support::running_worker;

    #[tokio::test]
    async fn test_register_grows_snapshot() {
        let pool = ProcessPool::new();
        for seq in 0..5 {
            pool.register(Arc::new(running_worker(seq, 0))).await;
            assert_eq!(pool.snapshot().await.len(), seq as usize + 1);
        }
    }

    #[tokio::test]
    async fn test_snapshot_ordered_by_seq() {
        let pool = ProcessPool::new();
        for seq in [3, 0, 2, 1] {
            pool.register(Arc::new(running_worker(seq, 0))).await;
        }

        let seqs: Vec<u64> = pool.snapshot().await.iter().map(|w| w.seq()).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let pool = ProcessPool::new();
        pool.register(Arc::new(running_worker(0, 0))).await;
        pool.register(Arc::new(running_worker(1, 0))).await;

        assert!(pool.unregister_if_present(1).await.is_some());
        assert!(pool.unregister_if_present(1).await.is_none());
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_drain_empties_pool() {
        let pool = ProcessPool::new();
        for seq in 0..3 {
            pool.register(Arc::new(running_worker(seq, 0))).await;
        }

        let drained = pool.drain_all().await;
        assert_eq!(drained.len(), 3);
        assert!(pool.is_empty().await);
        assert!(pool.drain_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_copy() {
        let pool = ProcessPool::new();
        pool.register(Arc::new(running_worker(0, 0))).await;

        let snapshot = pool.snapshot().await;
        pool.drain_all().await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(pool.len().await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let pool = Arc::new(ProcessPool::new());
        let mut handles = Vec::new();
        for seq in 0..20 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.register(Arc::new(running_worker(seq, 0))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(pool.len().await, 20);
    }
}
