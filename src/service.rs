//! The limiter service: `check` and `status`, wired to a configuration
//! registry and the five algorithms (§4.3).

use std::sync::Arc;

use crate::algorithm::{FixedWindow, LeakyBucket, MultipleBuckets, RateLimitAlgorithm, SlidingWindow, TokenBucket};
use crate::config::{AlgorithmTag, ConfigRegistry, LimitConfig, LimitConfigOverrides};
use crate::decision::Verdict;
use crate::error::{RateLimitError, Result};
use crate::key::composite_key;
use crate::storage::KvStore;

/// Parameters for a `check` call.
#[derive(Debug, Clone, Default)]
pub struct CheckParams {
    /// The caller being rate limited.
    pub user_id: String,
    /// The dimension the caller's quota is partitioned over.
    pub action_type: String,
    /// Identifies which configuration record governs this check.
    pub unique_id: String,
    /// Which algorithm to use if no configuration exists yet.
    pub algorithm_type: AlgorithmTag,
    /// Caller-supplied parameter overrides for a new or changed configuration.
    pub overrides: LimitConfigOverrides,
}

/// Parameters for a `status` call.
#[derive(Debug, Clone, Default)]
pub struct StatusParams {
    /// The caller whose status is being queried.
    pub user_id: String,
    /// Identifies which configuration record governs this query.
    pub unique_id: String,
}

/// The result of a `status` call: either the current verdict under the
/// stored configuration, or an indication that no configuration exists yet.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    /// A configuration exists; here is its current verdict.
    Found {
        /// The current, non-mutating verdict.
        verdict: Verdict,
        /// The configuration this verdict was computed under.
        config: LimitConfig,
    },
    /// No configuration has ever been written for this `unique_id`.
    NoConfiguration,
}

/// Validates parameters, resolves configuration, and dispatches to the
/// matching algorithm.
pub struct LimiterService<S> {
    registry: ConfigRegistry<Arc<S>>,
    store: Arc<S>,
}

impl<S: KvStore> LimiterService<S> {
    /// Build a limiter service over a single store, used both for
    /// configuration records and algorithm state.
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        Self {
            registry: ConfigRegistry::new(store.clone()),
            store,
        }
    }

    /// Validate and run a rate-limit check, resolving or creating
    /// configuration as needed.
    pub async fn check(&self, params: CheckParams) -> Result<Verdict> {
        if params.user_id.is_empty() {
            return Err(RateLimitError::MissingParameter("user_id"));
        }
        if params.action_type.is_empty() {
            return Err(RateLimitError::MissingParameter("action_type"));
        }
        if params.unique_id.is_empty() {
            return Err(RateLimitError::MissingParameter("unique_id"));
        }

        let config = self
            .registry
            .resolve(
                &params.unique_id,
                &params.action_type,
                params.algorithm_type,
                params.overrides,
            )
            .await;

        let key = composite_key(&params.user_id, &params.action_type, &params.unique_id);
        Ok(self.dispatch(&config).check(&self.store, &key).await)
    }

    /// Validate and query the current status without recording a request.
    pub async fn status(&self, params: StatusParams) -> Result<StatusOutcome> {
        if params.user_id.is_empty() {
            return Err(RateLimitError::MissingParameter("user_id"));
        }
        if params.unique_id.is_empty() {
            return Err(RateLimitError::MissingParameter("unique_id"));
        }

        let Some(config) = self.registry.get(&params.unique_id).await else {
            return Ok(StatusOutcome::NoConfiguration);
        };

        let key = composite_key(&params.user_id, &config.action_type, &params.unique_id);
        let verdict = self.dispatch(&config).get_status(&self.store, &key).await;
        Ok(StatusOutcome::Found { verdict, config })
    }

    fn dispatch(&self, config: &LimitConfig) -> Dispatched {
        match config.algorithm_type {
            AlgorithmTag::TokenBucket => {
                Dispatched::TokenBucket(TokenBucket::new(config.rate, config.capacity))
            }
            AlgorithmTag::FixedWindow => {
                Dispatched::FixedWindow(FixedWindow::new(config.max_requests, config.window_size))
            }
            AlgorithmTag::SlidingWindow => Dispatched::SlidingWindow(SlidingWindow::new(
                config.max_requests,
                config.window_size,
            )),
            AlgorithmTag::LeakyBucket => {
                Dispatched::LeakyBucket(LeakyBucket::new(config.rate, config.capacity))
            }
            AlgorithmTag::MultipleBuckets => Dispatched::MultipleBuckets(MultipleBuckets::new(
                config.rate,
                config.capacity,
                config.max_requests,
                config.window_size,
            )),
        }
    }
}

/// One of the five algorithms, chosen at runtime from configuration.
enum Dispatched {
    TokenBucket(TokenBucket),
    FixedWindow(FixedWindow),
    SlidingWindow(SlidingWindow),
    LeakyBucket(LeakyBucket),
    MultipleBuckets(MultipleBuckets),
}

impl Dispatched {
    async fn check<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        match self {
            Dispatched::TokenBucket(a) => a.check(store, key).await,
            Dispatched::FixedWindow(a) => a.check(store, key).await,
            Dispatched::SlidingWindow(a) => a.check(store, key).await,
            Dispatched::LeakyBucket(a) => a.check(store, key).await,
            Dispatched::MultipleBuckets(a) => a.check(store, key).await,
        }
    }

    async fn get_status<S: KvStore>(&self, store: &S, key: &str) -> Verdict {
        match self {
            Dispatched::TokenBucket(a) => a.get_status(store, key).await,
            Dispatched::FixedWindow(a) => a.get_status(store, key).await,
            Dispatched::SlidingWindow(a) => a.get_status(store, key).await,
            Dispatched::LeakyBucket(a) => a.get_status(store, key).await,
            Dispatched::MultipleBuckets(a) => a.get_status(store, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn missing_user_id_fails_validation() {
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

    #[tokio::test]
    async fn check_resolves_defaults_and_enforces() {
        let service = LimiterService::new(MemoryStore::new());
        let params = CheckParams {
            user_id: "alice".into(),
            action_type: "chat".into(),
            unique_id: "u1".into(),
            algorithm_type: AlgorithmTag::FixedWindow,
            overrides: LimitConfigOverrides {
                max_requests: Some(1),
                window_size: Some(60),
                ..Default::default()
            },
        };

        let first = service.check(params.clone()).await.unwrap();
        assert!(first.allowed);
        let second = service.check(params).await.unwrap();
        assert!(!second.allowed);
    }

    #[tokio::test]
    async fn status_before_any_check_reports_no_configuration() {
        let service = LimiterService::new(MemoryStore::new());
        let outcome = service
            .status(StatusParams {
                user_id: "alice".into(),
                unique_id: "never-configured".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome, StatusOutcome::NoConfiguration);
    }

    #[tokio::test]
    async fn status_after_check_reports_the_stored_configuration() {
        let service = LimiterService::new(MemoryStore::new());
        service
            .check(CheckParams {
                user_id: "alice".into(),
                action_type: "chat".into(),
                unique_id: "u1".into(),
                algorithm_type: AlgorithmTag::TokenBucket,
                overrides: LimitConfigOverrides::default(),
            })
            .await
            .unwrap();

        let outcome = service
            .status(StatusParams {
                user_id: "alice".into(),
                unique_id: "u1".into(),
            })
            .await
            .unwrap();

        match outcome {
            StatusOutcome::Found { config, .. } => {
                assert_eq!(config.algorithm_type, AlgorithmTag::TokenBucket);
                assert_eq!(config.action_type, "chat");
            }
            StatusOutcome::NoConfiguration => panic!("expected a configuration"),
        }
    }
}
