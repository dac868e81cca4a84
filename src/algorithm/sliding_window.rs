//! Sliding window algorithm.
//!
//! Keeps the timestamp of every admitted request in the trailing
//! `window_size` seconds and counts how many remain after purging stale
//! entries. Smoother than a fixed window: it has no reset-boundary cliff.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::{clamp_ttl, storage_key, RateLimitAlgorithm};
use crate::clock::{Clock, SystemClock};
use crate::config::AlgorithmTag;
use crate::decision::{ReasonCode, Verdict};
use crate::reason;
use crate::storage::KvStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    requests: Vec<f64>,
}

/// Sliding window rate limiter.
pub struct SlidingWindow {
    max_requests: u64,
    window_size: i64,
    clock: Arc<dyn Clock>,
}

impl SlidingWindow {
    /// Create a sliding window limiter, using the system clock.
    pub fn new(max_requests: u64, window_size: i64) -> Self {
        Self::with_clock(max_requests, window_size, Arc::new(SystemClock))
    }

    /// Create a sliding window limiter with an injected clock, for
    /// deterministic tests.
    pub fn with_clock(max_requests: u64, window_size: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_requests,
            window_size,
            clock,
        }
    }

    fn purge(&self, state: &State, now: f64) -> Vec<f64> {
        let threshold = now - self.window_size as f64;
        state
            .requests
            .iter()
            .copied()
            .filter(|&ts| ts > threshold)
            .collect()
    }

    fn verdict_for(&self, requests: &[f64], now: f64) -> Verdict {
        let count = requests.len() as u64;
        let reset_time = requests
            .first()
            .map(|&oldest| (oldest + self.window_size as f64).floor() as i64)
            .unwrap_or_else(|| (now + self.window_size as f64).floor() as i64);

        if count < self.max_requests {
            Verdict::allowed(self.max_requests - count, reset_time)
        } else {
            let wait_time = (reset_time as f64 - now).ceil().max(0.0) as i64;
            let (reason, reason_cn) =
                reason::window(self.max_requests, self.window_size, count, wait_time);
            Verdict::denied(0, reset_time, reason, reason_cn, ReasonCode::RateWindow)
        }
    }
}

impl RateLimitAlgorithm for SlidingWindow {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::SlidingWindow
    }

    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            None => State::default(),
        };
        let purged = self.purge(&state, now);

        if purged.len() as u64 >= self.max_requests {
            return self.verdict_for(&purged, now);
        }

        let mut appended = purged;
        appended.push(now);
        let new_state = State {
            requests: appended.clone(),
        };
        if let Ok(raw) = serde_json::to_vec(&new_state) {
            store
                .set(&storage_key, raw, Some(clamp_ttl(self.window_size)))
                .await;
        }

        self.verdict_for(&appended, now)
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
            None => State::default(),
        };
        let purged = self.purge(&state, now);

        self.verdict_for(&purged, now)
    }
}
