//! A sliding-window token bucket that also serialises admission.
//!
//! At most `capacity` calls are admitted in any window of length `window`, and only one admitted call runs at a time.
//! A call that would exceed the budget waits until the oldest admission in the window expires.
use std::{collections::VecDeque, fmt::Debug, future::Future, time::Duration};

use log::*;
use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

use crate::sync_api::sync_config::SyncConfig;

pub struct TokenBucket {
    capacity: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenBucket({} per {:?})", self.capacity, self.window)
    }
}

impl TokenBucket {
    pub fn new(capacity: usize, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, window, admitted: Mutex::new(VecDeque::with_capacity(capacity)) }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.bucket_size, config.bucket_window)
    }

    /// Waits for a slot, then runs `call` to completion. No other call is admitted until this one has finished.
    pub async fn run<F, T>(&self, call: F) -> T
    where F: Future<Output = T> {
        let mut admitted = self.admitted.lock().await;
        loop {
            let now = Instant::now();
            while admitted.front().is_some_and(|t| now.duration_since(*t) >= self.window) {
                admitted.pop_front();
            }
            if admitted.len() < self.capacity {
                break;
            }
            // The budget is full, so the front entry exists and is still inside the window.
            if let Some(oldest) = admitted.front().copied() {
                let wait_until = oldest + self.window;
                debug!("🚦️ Rate limit reached. Waiting {:?} for the next slot", wait_until.duration_since(now));
                sleep_until(wait_until).await;
            }
        }
        admitted.push_back(Instant::now());
        trace!("🚦️ Call admitted ({} of {} in the current window)", admitted.len(), self.capacity);
        call.await
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use futures_util::future::join_all;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn never_more_than_capacity_per_window() {
        let bucket = TokenBucket::new(35, Duration::from_secs(5));
        let start = Instant::now();
        let mut stamps = Vec::new();
        for _ in 0..80 {
            let t = bucket.run(async { Instant::now() }).await;
            stamps.push(t.duration_since(start));
        }
        assert!(stamps[34] < Duration::from_secs(5));
        assert!(stamps[35] >= Duration::from_secs(5));
        assert!(stamps[70] >= Duration::from_secs(10));
        for i in 0..stamps.len() - 35 {
            assert!(stamps[i + 35] - stamps[i] >= Duration::from_secs(5), "window violated at call {i}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn admission_is_serialised() {
        let bucket = TokenBucket::new(35, Duration::from_secs(5));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let calls = (0..10).map(|_| {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            bucket.run(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            })
        });
        join_all(calls).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bucket = TokenBucket::new(0, Duration::from_secs(1));
        assert_eq!(format!("{bucket:?}"), "TokenBucket(1 per 1s)");
    }
}
