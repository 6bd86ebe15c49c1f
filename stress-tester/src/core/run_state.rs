//! Run state: the one-way stop flag, run start time and sequence counter

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Shared state of a single run
#[derive(Debug)]
pub struct RunState {
    stop_requested: AtomicBool,
    stop_tx: watch::Sender<bool>,
    started: Instant,
    started_at: DateTime<Utc>,
    next_seq: AtomicU64,
}

impl RunState {
    /// Start the run clock now
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            stop_requested: AtomicBool::new(false),
            stop_tx,
            started: Instant::now(),
            started_at: Utc::now(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Flip stop-requested; true only for the caller that flipped it
    pub fn request_stop(&self) -> bool {
        let won = self
            .stop_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.stop_tx.send_replace(true);
        }
        won
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Resolves once stop has been requested
    pub async fn stopped(&self) {
        let mut rx = self.stop_tx.subscribe();
        // The sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Next zero-based launch sequence number
    pub fn next_sequence(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_stop_flips_exactly_once() {
        let state = RunState::new();
        assert!(!state.is_stop_requested());

        assert!(state.request_stop());
        assert!(!state.request_stop());
        assert!(state.is_stop_requested());
    }

    #[test]
    fn test_sequence_is_zero_based_and_monotonic() {
        let state = RunState::new();
        assert_eq!(state.next_sequence(), 0);
        assert_eq!(state.next_sequence(), 1);
        assert_eq!(state.next_sequence(), 2);
    }

    #[tokio::test]
    async fn test_stopped_wakes_waiters() {
        let state = Arc::new(RunState::new());
        let waiter = tokio::spawn({
            let state = state.clone();
            async move { state.stopped().await }
        });

        tokio::task::yield_now().await;
        state.request_stop();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_the_fact() {
        let state = RunState::new();
        state.request_stop();

        tokio::time::timeout(Duration::from_millis(100), state.stopped())
            .await
            .expect("already stopped");
    }

    #[test]
    fn test_only_one_concurrent_winner() {
        let state = Arc::new(RunState::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.request_stop())
            })
            .collect();

        let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();
        assert_eq!(winners, 1);
    }
}
