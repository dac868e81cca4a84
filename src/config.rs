//! Per-`unique_id` configuration registry.
//!
//! A configuration record binds a business identifier to an algorithm choice
//! and its parameters so that independent `check` and `status` calls agree on
//! what they're enforcing.

use serde::{Deserialize, Serialize};

use crate::error::{RateLimitError, Result};
use crate::storage::KvStore;

const CONFIG_KEY_PREFIX: &str = "safety_chat:rate_limiter:config";

/// One of the five supported rate-limiting algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmTag {
    /// Token bucket.
    TokenBucket,
    /// Fixed window counter.
    FixedWindow,
    /// Sliding window counter.
    SlidingWindow,
    /// Leaky bucket.
    LeakyBucket,
    /// Composite token + sliding-window + leaky-bucket limiter.
    MultipleBuckets,
}

impl AlgorithmTag {
    /// The wire tag used in storage keys and the configuration surface.
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmTag::TokenBucket => "token_bucket",
            AlgorithmTag::FixedWindow => "fixed_window",
            AlgorithmTag::SlidingWindow => "sliding_window",
            AlgorithmTag::LeakyBucket => "leaky_bucket",
            AlgorithmTag::MultipleBuckets => "multiple_buckets",
        }
    }

    /// Parse a tag string, rejecting anything outside the closed set.
    pub fn parse(tag: &str) -> Result<Self> {
        match tag {
            "token_bucket" => Ok(AlgorithmTag::TokenBucket),
            "fixed_window" => Ok(AlgorithmTag::FixedWindow),
            "sliding_window" => Ok(AlgorithmTag::SlidingWindow),
            "leaky_bucket" => Ok(AlgorithmTag::LeakyBucket),
            "multiple_buckets" => Ok(AlgorithmTag::MultipleBuckets),
            other => Err(RateLimitError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl Default for AlgorithmTag {
    fn default() -> Self {
        AlgorithmTag::TokenBucket
    }
}

/// Algorithm parameters and the `action_type` dimension, keyed by `unique_id`.
///
/// Only the fields relevant to `algorithm_type` are meaningful; the rest
/// carry their documented defaults and are ignored by algorithms that don't
/// use them, except `multiple_buckets`, which uses all four.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Opaque dimension a user's quota is partitioned over (e.g. "chat").
    pub action_type: String,
    /// Which of the five algorithms this `unique_id` uses.
    pub algorithm_type: AlgorithmTag,
    /// Tokens/leak units per second.
    pub rate: f64,
    /// Token or leaky bucket capacity.
    pub capacity: u64,
    /// Fixed/sliding/multiple window request ceiling.
    pub max_requests: u64,
    /// Fixed/sliding/multiple window size, in seconds.
    pub window_size: i64,
}

impl LimitConfig {
    /// Defaults for a given algorithm, with everything else left at its
    /// per-algorithm default as well (§6).
    pub fn defaults_for(algorithm_type: AlgorithmTag, action_type: impl Into<String>) -> Self {
        let (rate, capacity, max_requests, window_size) = match algorithm_type {
            AlgorithmTag::TokenBucket | AlgorithmTag::LeakyBucket => (10.0, 100, 100, 60),
            AlgorithmTag::FixedWindow | AlgorithmTag::SlidingWindow => (10.0, 100, 100, 60),
            AlgorithmTag::MultipleBuckets => (10.0, 100, 1000, 3600),
        };

        Self {
            action_type: action_type.into(),
            algorithm_type,
            rate,
            capacity,
            max_requests,
            window_size,
        }
    }
}

/// Caller-supplied overrides for a configuration record; `None` fields fall
/// through to the per-algorithm default.
#[derive(Debug, Clone, Default)]
pub struct LimitConfigOverrides {
    /// Override for `rate`.
    pub rate: Option<f64>,
    /// Override for `capacity`.
    pub capacity: Option<u64>,
    /// Override for `max_requests`.
    pub max_requests: Option<u64>,
    /// Override for `window_size`.
    pub window_size: Option<i64>,
}

/// Reads and persists `LimitConfig` records keyed by `unique_id`.
pub struct ConfigRegistry<S> {
    store: S,
}

impl<S: KvStore> ConfigRegistry<S> {
    /// Wrap a store as a configuration registry.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn key(unique_id: &str) -> String {
        format!("{CONFIG_KEY_PREFIX}:{unique_id}")
    }

    /// Read the configuration for `unique_id`, if any.
    pub async fn get(&self, unique_id: &str) -> Option<LimitConfig> {
        let raw = self.store.get(&Self::key(unique_id)).await?;
        match serde_json::from_slice(&raw) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(error = %err, unique_id, "config record corrupt, treating as absent");
                None
            }
        }
    }

    /// Resolve the configuration for `unique_id` against caller-supplied
    /// parameters, persisting it if it is new or differs from what is
    /// stored (§4.3 step 3, §9). Parameters missing from `overrides` fall
    /// through to the per-algorithm default.
    pub async fn resolve(
        &self,
        unique_id: &str,
        action_type: &str,
        algorithm_type: AlgorithmTag,
        overrides: LimitConfigOverrides,
    ) -> LimitConfig {
        let defaults = LimitConfig::defaults_for(algorithm_type, action_type);
        let resolved = LimitConfig {
            action_type: action_type.to_string(),
            algorithm_type,
            rate: overrides.rate.unwrap_or(defaults.rate),
            capacity: overrides.capacity.unwrap_or(defaults.capacity),
            max_requests: overrides.max_requests.unwrap_or(defaults.max_requests),
            window_size: overrides.window_size.unwrap_or(defaults.window_size),
        };

        let existing = self.get(unique_id).await;
        if existing.as_ref() != Some(&resolved) {
            if let Ok(raw) = serde_json::to_vec(&resolved) {
                self.store.set(&Self::key(unique_id), raw, None).await;
            }
        }

        resolved
    }
}
