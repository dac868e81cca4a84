//! A multi-algorithm rate limiting engine for per-user, per-action quotas.
//!
//! `rate-limiter-engine` provides:
//!
//! - **Five algorithms**: token bucket, fixed window, sliding window, leaky
//!   bucket, and a composite "multiple buckets" limiter.
//! - **Pluggable storage**: in-memory with GC, Redis with connection
//!   pooling, or a host-provided untyped KV capability.
//! - **Configuration registry**: per-`unique_id` limits resolved once and
//!   re-persisted only when they change.
//! - **Bilingual denial reasons**: English and Chinese text plus a closed
//!   set of machine-readable reason codes.
//!
//! # Quick Start
//!
//! ```ignore
//! use rate_limiter_engine::{AlgorithmTag, CheckParams, LimiterService, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = LimiterService::new(MemoryStore::new());
//!
//!     let verdict = service
//!         .check(CheckParams {
//!             user_id: "alice".into(),
//!             action_type: "chat".into(),
//!             unique_id: "chat-default".into(),
//!             algorithm_type: AlgorithmTag::TokenBucket,
//!             ..Default::default()
//!         })
//!         .await
//!         .unwrap();
//!
//!     if verdict.allowed {
//!         println!("allowed, {} remaining", verdict.remaining);
//!     } else {
//!         println!("denied: {}", verdict.reason);
//!     }
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): in-memory storage with garbage collection.
//! - `redis`: Redis storage backend.

pub mod algorithm;
pub mod clock;
pub mod config;
pub mod decision;
pub mod error;
pub mod key;
pub mod reason;
pub mod service;
pub mod storage;

pub use algorithm::{FixedWindow, LeakyBucket, MultipleBuckets, RateLimitAlgorithm, SlidingWindow, TokenBucket};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{AlgorithmTag, ConfigRegistry, LimitConfig, LimitConfigOverrides};
pub use decision::{ReasonCode, Verdict};
pub use error::{RateLimitError, Result};
pub use key::composite_key;
pub use service::{CheckParams, LimiterService, StatusOutcome, StatusParams};
pub use storage::{HostKv, HostKvStore, KvStore};

#[cfg(feature = "memory")]
pub use storage::{GcConfig, GcInterval, MemoryStore};

#[cfg(feature = "redis")]
pub use storage::{RedisConfig, RedisStore};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::{
        FixedWindow, LeakyBucket, MultipleBuckets, RateLimitAlgorithm, SlidingWindow, TokenBucket,
    };
    pub use crate::config::{AlgorithmTag, ConfigRegistry, LimitConfig, LimitConfigOverrides};
    pub use crate::decision::{ReasonCode, Verdict};
    pub use crate::error::{RateLimitError, Result};
    pub use crate::service::{CheckParams, LimiterService, StatusOutcome, StatusParams};
    pub use crate::storage::KvStore;

    #[cfg(feature = "memory")]
    pub use crate::storage::{GcConfig, GcInterval, MemoryStore};

    #[cfg(feature = "redis")]
    pub use crate::storage::{RedisConfig, RedisStore};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_integration_token_bucket_burst() {
        let service = LimiterService::new(MemoryStore::new());
        let params = CheckParams {
            user_id: "user:1".into(),
            action_type: "chat".into(),
            unique_id: "burst".into(),
            algorithm_type: AlgorithmTag::TokenBucket,
            overrides: LimitConfigOverrides {
                rate: Some(1.0),
                capacity: Some(5),
                ..Default::default()
            },
        };

        for i in 1..=5 {
            let verdict = service.check(params.clone()).await.unwrap();
            assert!(verdict.allowed, "request {i} should be allowed");
        }

        let verdict = service.check(params).await.unwrap();
        assert!(!verdict.allowed);
        assert_eq!(verdict.reason_code, ReasonCode::RateNoTokens);
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_integration_fixed_window() {
        let service = LimiterService::new(MemoryStore::new());
        let params = CheckParams {
            user_id: "user:1".into(),
            action_type: "chat".into(),
            unique_id: "window".into(),
            algorithm_type: AlgorithmTag::FixedWindow,
            overrides: LimitConfigOverrides {
                max_requests: Some(2),
                window_size: Some(60),
                ..Default::default()
            },
        };

        assert!(service.check(params.clone()).await.unwrap().allowed);
        assert!(service.check(params.clone()).await.unwrap().allowed);
        assert!(!service.check(params).await.unwrap().allowed);
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_integration_status_reflects_config() {
        let service = LimiterService::new(MemoryStore::new());
        service
            .check(CheckParams {
                user_id: "user:1".into(),
                action_type: "chat".into(),
                unique_id: "status-check".into(),
                algorithm_type: AlgorithmTag::LeakyBucket,
                overrides: LimitConfigOverrides {
                    rate: Some(2.0),
                    capacity: Some(4),
                    ..Default::default()
                },
            })
            .await
            .unwrap();

        let outcome = service
            .status(StatusParams {
                user_id: "user:1".into(),
                unique_id: "status-check".into(),
            })
            .await
            .unwrap();

        match outcome {
            StatusOutcome::Found { verdict, config } => {
                assert!(verdict.allowed);
                assert_eq!(config.algorithm_type, AlgorithmTag::LeakyBucket);
                assert_eq!(config.rate, 2.0);
            }
            StatusOutcome::NoConfiguration => panic!("expected a configuration"),
        }
    }

    #[cfg(feature = "memory")]
    #[tokio::test]
    async fn test_integration_missing_field_is_a_validation_error() {
        let service = LimiterService::new(MemoryStore::new());
        let err = service
            .check(CheckParams {
                action_type: "chat".into(),
                unique_id: "u1".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err, RateLimitError::MissingParameter("user_id"));
    }
}
