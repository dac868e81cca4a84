//! Fixed window algorithm.
//!
//! Counts requests within an aligned `window_size`-second window and resets
//! the counter to zero at each window boundary. Simple and cheap, but admits
//! bursts of up to `2 * max_requests` around a boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::{clamp_ttl, storage_key, RateLimitAlgorithm};
use crate::clock::{Clock, SystemClock};
use crate::config::AlgorithmTag;
use crate::decision::{ReasonCode, Verdict};
use crate::reason;
use crate::storage::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct State {
    start: i64,
    count: u64,
}

/// Fixed window counter rate limiter.
pub struct FixedWindow {
    max_requests: u64,
    window_size: i64,
    clock: Arc<dyn Clock>,
}

impl FixedWindow {
    /// Create a fixed window limiter, using the system clock.
    pub fn new(max_requests: u64, window_size: i64) -> Self {
        Self::with_clock(max_requests, window_size, Arc::new(SystemClock))
    }

    /// Create a fixed window limiter with an injected clock, for
    /// deterministic tests.
    pub fn with_clock(max_requests: u64, window_size: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window_size,
            clock,
        }
    }

    fn window_start(&self, now: f64) -> i64 {
        let now = now.floor() as i64;
        now - now.rem_euclid(self.window_size)
    }

    fn current_state(&self, state: &State, window_start: i64) -> State {
        if state.start == window_start {
            state.clone()
        } else {
            State {
                start: window_start,
                count: 0,
            }
        }
    }

    fn verdict_for(&self, count: u64, window_start: i64, now: f64) -> Verdict {
        let reset_time = window_start + self.window_size;
        if count < self.max_requests {
            Verdict::allowed(self.max_requests - count, reset_time)
        } else {
            let wait_time = reset_time - now.floor() as i64;
            let (reason, reason_cn) =
                reason::window(self.max_requests, self.window_size, count, wait_time.max(0));
            Verdict::denied(0, reset_time, reason, reason_cn, ReasonCode::RateMaxReq)
        }
    }
}

impl RateLimitAlgorithm for FixedWindow {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::FixedWindow
    }

    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let window_start = self.window_start(now);
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                start: window_start,
                count: 0,
            }),
            None => State {
                start: window_start,
                count: 0,
            },
        };
        let state = self.current_state(&state, window_start);

        if state.count >= self.max_requests {
            return self.verdict_for(state.count, window_start, now);
        }

        let new_count = state.count + 1;
        let new_state = State {
            start: window_start,
            count: new_count,
        };
        if let Ok(raw) = serde_json::to_vec(&new_state) {
            let ttl = clamp_ttl(window_start + self.window_size - now.floor() as i64);
            store.set(&storage_key, raw, Some(ttl)).await;
        }

        self.verdict_for(new_count, window_start, now)
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let window_start = self.window_start(now);
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                start: window_start,
                count: 0,
            }),
            None => State {
                start: window_start,
                count: 0,
            },
        };
        let state = self.current_state(&state, window_start);

        self.verdict_for(state.count, window_start, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_denies() {
        let clock = Arc::new(FakeClock::new());
        let window = FixedWindow::with_clock(2, 10, clock);
        let store = MemoryStore::new();

        let a = window.check(&store, "u:a:c").await;
        assert!(a.allowed);
        assert_eq!(a.remaining, 1);

        let b = window.check(&store, "u:a:c").await;
        assert!(b.allowed);
        assert_eq!(b.remaining, 0);

        let c = window.check(&store, "u:a:c").await;
        assert!(!c.allowed);
        assert_eq!(c.reason_code, ReasonCode::RateMaxReq);
    }

    #[tokio::test]
    async fn resets_at_the_next_window_boundary() {
        let clock = Arc::new(FakeClock::new());
        let window = FixedWindow::with_clock(2, 10, clock.clone());
        let store = MemoryStore::new();

        window.check(&store, "u:a:c").await;
        window.check(&store, "u:a:c").await;
        assert!(!window.check(&store, "u:a:c").await.allowed);

        clock.set(10.0);
        let v = window.check(&store, "u:a:c").await;
        assert!(v.allowed);
    }

    #[tokio::test]
    async fn status_does_not_mutate() {
        let clock = Arc::new(FakeClock::new());
        let window = FixedWindow::with_clock(2, 10, clock);
        let store = MemoryStore::new();

        window.check(&store, "u:a:c").await;
        let a = window.get_status(&store, "u:a:c").await;
        let b = window.get_status(&store, "u:a:c").await;
        assert_eq!(a, b);
    }
}
