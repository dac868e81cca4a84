//! Token bucket algorithm.
//!
//! A bucket holds up to `capacity` tokens, refilled at `rate` tokens/second.
//! Each admitted request consumes one token. Supports bursts up to
//! `capacity` while bounding the long-run average rate to `rate`.

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
    tokens: f64,
    last_refill: f64,
}

/// Token bucket rate limiter.
pub struct TokenBucket {
    rate: f64,
    capacity: u64,
    clock: Arc<dyn Clock>,
}

impl TokenBucket {
    /// Create a token bucket with the given refill rate (tokens/second) and
    /// capacity, using the system clock.
    pub fn new(rate: f64, capacity: u64) -> Self {
        Self::with_clock(rate, capacity, Arc::new(SystemClock))
    }

    /// Create a token bucket with an injected clock, for deterministic tests.
    pub fn with_clock(rate: f64, capacity: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate,
            capacity,
            clock,
        }
    }

    fn refill(&self, state: &State, now: f64) -> f64 {
        let elapsed = (now - state.last_refill).max(0.0);
        (state.tokens + elapsed * self.rate).min(self.capacity as f64)
    }

    fn ttl_seconds(&self) -> i64 {
        (1.0 / self.rate).ceil() as i64
    }

    fn verdict_for(&self, tokens: f64, now: f64) -> Verdict {
        let reset_time = (now + 1.0 / self.rate).floor() as i64;
        if tokens >= 1.0 {
            Verdict::allowed(tokens.floor().max(0.0) as u64, reset_time)
        } else {
            let wait_time = ((1.0 - tokens) / self.rate).ceil() as i64;
            let (reason, reason_cn) = reason::token_bucket(self.rate, wait_time);
            Verdict::denied(0, reset_time, reason, reason_cn, ReasonCode::RateNoTokens)
        }
    }
}

impl RateLimitAlgorithm for TokenBucket {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::TokenBucket
    }

    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                tokens: self.capacity as f64,
                last_refill: now,
            }),
            None => State {
                tokens: self.capacity as f64,
                last_refill: now,
            },
        };

        let tokens = self.refill(&state, now);
        if tokens < 1.0 {
            return self.verdict_for(tokens, now);
        }

        let remaining_tokens = tokens - 1.0;
        let new_state = State {
            tokens: remaining_tokens,
            last_refill: now,
        };
        if let Ok(raw) = serde_json::to_vec(&new_state) {
            store
                .set(&storage_key, raw, Some(clamp_ttl(self.ttl_seconds())))
                .await;
        }

        self.verdict_for(remaining_tokens, now)
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => serde_json::from_slice(&raw).unwrap_or(State {
                tokens: self.capacity as f64,
                last_refill: now,
            }),
            None => State {
                tokens: self.capacity as f64,
                last_refill: now,
            },
        };

        let tokens = self.refill(&state, now);
        self.verdict_for(tokens, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn burst_then_deny() {
        let clock = Arc::new(FakeClock::new());
        let bucket = TokenBucket::with_clock(1.0, 5, clock.clone());
        let store = MemoryStore::new();

        let mut remaining = Vec::new();
        for _ in 0..5 {
            let v = bucket.check(&store, "u:a:c").await;
            assert!(v.allowed);
            remaining.push(v.remaining);
        }
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let denied = bucket.check(&store, "u:a:c").await;
        assert!(!denied.allowed);
        assert_eq!(denied.reason_code, ReasonCode::RateNoTokens);
    }

    #[tokio::test]
    async fn recovers_after_refill() {
        let clock = Arc::new(FakeClock::new());
        let bucket = TokenBucket::with_clock(1.0, 5, clock.clone());
        let store = MemoryStore::new();

        for _ in 0..6 {
            bucket.check(&store, "u:a:c").await;
        }
        clock.set(2.1);
        let v = bucket.check(&store, "u:a:c").await;
        assert!(v.allowed);
    }

    #[tokio::test]
    async fn status_does_not_mutate() {
        let clock = Arc::new(FakeClock::new());
        let bucket = TokenBucket::with_clock(1.0, 5, clock);
        let store = MemoryStore::new();

        let a = bucket.get_status(&store, "u:a:c").await;
        let b = bucket.get_status(&store, "u:a:c").await;
        assert_eq!(a.remaining, b.remaining);
        assert_eq!(a.allowed, b.allowed);
    }
}
