//! Multiple buckets algorithm: a composite of token bucket, sliding window,
//! and leaky bucket sub-limits evaluated together.
//!
//! All three sub-states are carried in one record. A request is admitted
//! only if every sub-limit currently has room; when denied, the reason text
//! is drawn from the first failing sub-limit in the order token bucket →
//! sliding window → leaky bucket, falling back to a generic message if none
//! of the three individually explains the denial.

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
    requests: Vec<f64>,
    water: f64,
    last_leak: f64,
}

impl State {
    fn fresh(capacity: u64, now: f64) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: now,
            requests: Vec::new(),
            water: 0.0,
            last_leak: now,
        }
    }
}

/// Composite token bucket + sliding window + leaky bucket limiter.
pub struct MultipleBuckets {
    rate: f64,
    capacity: u64,
    max_requests: u64,
    window_size: i64,
    clock: Arc<dyn Clock>,
}

impl MultipleBuckets {
    /// Create a composite limiter, using the system clock.
    pub fn new(rate: f64, capacity: u64, max_requests: u64, window_size: i64) -> Self {
        Self::with_clock(rate, capacity, max_requests, window_size, Arc::new(SystemClock))
    }

    /// Create a composite limiter with an injected clock, for deterministic
    /// tests.
    pub fn with_clock(
        rate: f64,
        capacity: u64,
        max_requests: u64,
        window_size: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rate,
            capacity,
            max_requests,
            window_size,
            clock,
        }
    }

    fn recompute(&self, state: &State, now: f64) -> (f64, Vec<f64>, f64) {
        let elapsed_refill = (now - state.last_refill).max(0.0);
        let tokens = (state.tokens + elapsed_refill * self.rate).min(self.capacity as f64);

        let window_start = now - self.window_size as f64;
        let requests: Vec<f64> = state
            .requests
            .iter()
            .copied()
            .filter(|&ts| ts > window_start)
            .collect();

        let leaked = (now - state.last_leak).max(0.0) * self.rate;
        let water = (state.water - leaked).max(0.0);

        (tokens, requests, water)
    }

    fn reset_time(&self, tokens: f64, requests: &[f64], water: f64, now: f64) -> i64 {
        let mut candidates = Vec::new();
        if tokens < self.capacity as f64 {
            candidates.push(now + (self.capacity as f64 - tokens) / self.rate);
        }
        if let Some(&first) = requests.first() {
            candidates.push(first + self.window_size as f64);
        }
        if water > 0.0 {
            candidates.push(now + water / self.rate);
        }

        candidates
            .into_iter()
            .fold(None, |acc: Option<f64>, v| match acc {
                Some(a) if a <= v => Some(a),
                _ => Some(v),
            })
            .unwrap_or(now + self.window_size as f64)
            .floor() as i64
    }

    fn verdict_for(&self, tokens: f64, requests: &[f64], water: f64, now: f64) -> Verdict {
        let remaining = (tokens.floor() as i64)
            .min(self.max_requests as i64 - requests.len() as i64)
            .min((self.capacity as f64 - water).floor() as i64)
            .max(0) as u64;
        let reset_time = self.reset_time(tokens, requests, water, now);

        let allowed = tokens >= 1.0
            && (requests.len() as u64) < self.max_requests
            && water < self.capacity as f64;

        if allowed {
            return Verdict::allowed(remaining, reset_time);
        }

        let (reason, reason_cn) = if tokens < 1.0 {
            let wait_time = ((1.0 - tokens) / self.rate).ceil() as i64;
            reason::token_bucket(self.rate, wait_time.max(0))
        } else if requests.len() as u64 >= self.max_requests {
            let wait_time = (requests[0] + self.window_size as f64 - now) as i64;
            reason::window(
                self.max_requests,
                self.window_size,
                requests.len() as u64,
                wait_time.max(0),
            )
        } else if water >= self.capacity as f64 {
            let wait_time = ((water - self.capacity as f64 + 1.0) / self.rate).ceil() as i64;
            reason::leaky_bucket(self.rate, wait_time.max(0))
        } else {
            let wait_time = (reset_time as f64 - now) as i64;
            reason::multiple_buckets(wait_time.max(0))
        };

        Verdict::denied(0, reset_time, reason, reason_cn, ReasonCode::RateMulti)
    }
}

impl RateLimitAlgorithm for MultipleBuckets {
    fn tag(&self) -> AlgorithmTag {
        AlgorithmTag::MultipleBuckets
    }

    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => {
                serde_json::from_slice(&raw).unwrap_or_else(|_| State::fresh(self.capacity, now))
            }
            None => State::fresh(self.capacity, now),
        };

        let (tokens, requests, water) = self.recompute(&state, now);
        let allowed = tokens >= 1.0
            && (requests.len() as u64) < self.max_requests
            && water < self.capacity as f64;

        if !allowed {
            return self.verdict_for(tokens, &requests, water, now);
        }

        let new_tokens = tokens - 1.0;
        let mut new_requests = requests;
        new_requests.push(now);
        let new_water = water + 1.0;

        let new_state = State {
            tokens: new_tokens,
            last_refill: now,
            requests: new_requests.clone(),
            water: new_water,
            last_leak: now,
        };
        if let Ok(raw) = serde_json::to_vec(&new_state) {
            store
                .set(&storage_key, raw, Some(clamp_ttl(self.window_size)))
                .await;
        }

        self.verdict_for(new_tokens, &new_requests, new_water, now)
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        let now = self.clock.now_seconds();
        let storage_key = storage_key(self.tag(), key);

        let state = match store.get(&storage_key).await {
            Some(raw) => {
                serde_json::from_slice(&raw).unwrap_or_else(|_| State::fresh(self.capacity, now))
            }
            None => State::fresh(self.capacity, now),
        };

        let (tokens, requests, water) = self.recompute(&state, now);
        self.verdict_for(tokens, &requests, water, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn token_sub_limit_denies_first() {
        let clock = Arc::new(FakeClock::new());
        let limiter = MultipleBuckets::with_clock(10.0, 2, 100, 60, clock);
        let store = MemoryStore::new();

        assert!(limiter.check(&store, "u:a:c").await.allowed);
        assert!(limiter.check(&store, "u:a:c").await.allowed);
        let denied = limiter.check(&store, "u:a:c").await;
        assert!(!denied.allowed);
        assert_eq!(denied.reason_code, ReasonCode::RateMulti);
        assert!(denied.reason.contains("per second"));
    }

    #[tokio::test]
    async fn status_does_not_mutate() {
        let clock = Arc::new(FakeClock::new());
        let limiter = MultipleBuckets::with_clock(10.0, 100, 1000, 3600, clock);
        let store = MemoryStore::new();

        limiter.check(&store, "u:a:c").await;
        let a = limiter.get_status(&store, "u:a:c").await;
        let b = limiter.get_status(&store, "u:a:c").await;
        assert_eq!(a, b);
    }
}
