//! Leaky bucket algorithm.
//!
//! Requests fill a bucket of water up to `capacity`; the bucket leaks at
//! `rate` units/second. A request is admitted if there is room, smoothing
//! bursts into a constant outflow rather than allowing them through.

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
    water: f64,
    last_leak: f64,
}

/// Leaky bucket rate limiter.
pub struct LeakyBucket {
    rate: f64,
    capacity: u64,
    clock: Arc<dyn Clock>,
}

impl LeakyBucket {
    /// Create a leaky bucket with the given leak rate (units/second) and
    /// capacity, using the system clock.
    pub fn new(rate: f64, capacity: u64) -> Self {
        Self::with_clock(rate, capacity, Arc::new(SystemClock))
    }

    /// Create a leaky bucket with an injected clock, for deterministic tests.
    pub fn with_clock(rate: f64, capacity: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate,
            capacity,
            clock,
        }
    }

    fn leak(&self, state: &State, now: f64) -> f64 {
        let elapsed = (now - state.last_leak).max(0.0);
        (state.water - elapsed * self.rate).max(0.0)
    }

    fn verdict_for(&self, water: f64, now: f64) -> Verdict {
        let remaining = (self.capacity as f64 - water).floor().max(0.0) as u64;
        let reset_time = (now + 1.0 / self.rate).floor() as i64;
        if water < self.capacity as f64 {
            Verdict::allowed(remaining, reset_time)
        } else {
            let wait_time = ((water - self.capacity as f64 + 1.0) / self.rate).ceil() as i64;
            let (reason, reason_cn) = reason::leaky_bucket(self.rate, wait_time.max(1));
            Verdict::denied(0, reset_time, reason, reason_cn, ReasonCode::RateQueueFull)
        }
    }
}

impl RateLimitAlgorithm for LeakyBucket {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::LeakyBucket
    }

    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                water: 0.0,
                last_leak: now,
            }),
            None => State {
                water: 0.0,
                last_leak: now,
            },
        };

        let water = self.leak(&state, now);
        if water >= self.capacity as f64 {
            return self.verdict_for(water, now);
        }

        let new_water = water + 1.0;
        let new_state = State {
            water: new_water,
            last_leak: now,
        };
        if let Ok(raw) = serde_json::to_vec(&new_state) {
            let ttl = clamp_ttl((new_water / self.rate).ceil() as i64);
            store.set(&storage_key, raw, Some(ttl)).await;
        }

        self.verdict_for(new_water, now)
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                water: 0.0,
                last_leak: now,
            }),
            None => State {
                water: 0.0,
                last_leak: now,
            },
        };

        let water = self.leak(&state, now);
        self.verdict_for(water, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn saturates_then_drains() {
        let clock = Arc::new(FakeClock::new());
        let bucket = LeakyBucket::with_clock(1.0, 3, clock.clone());
        let store = MemoryStore::new();

        for _ in 0..3 {
            assert!(bucket.check(&store, "u:a:c").await.allowed);
        }
        assert!(!bucket.check(&store, "u:a:c").await.allowed);

        clock.set(1.1);
        assert!(bucket.check(&store, "u:a:c").await.allowed);
    }

    #[tokio::test]
    async fn status_does_not_mutate() {
        let clock = Arc::new(FakeClock::new());
        let bucket = LeakyBucket::with_clock(1.0, 3, clock);
        let store = MemoryStore::new();

        bucket.check(&store, "u:a:c").await;
        let a = bucket.get_status(&store, "u:a:c").await;
        let b = bucket.get_status(&store, "u:a:c").await;
        assert_eq!(a, b);
    }
}
