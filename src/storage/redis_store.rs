//! Redis storage backend for distributed rate limiting.
//!
//! Every fallible operation is caught here and turned into the store's
//! fail-open contract: a failed `get` is a miss, a failed `set`/`delete` is a
//! silent no-op, logged at `warn` level so an operator can see the backend is
//! unhealthy without the caller ever seeing an error.

use std::time::Duration;

use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};

use crate::storage::KvStore;

/// Redis storage configuration.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    pub url: String,
    /// Connection pool size.
    pub pool_size: usize,
    /// Key prefix applied to every key.
    pub key_prefix: String,
    /// Connection timeout.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            key_prefix: String::new(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Create a new Redis configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the pool size.
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }
}

/// Redis-backed `KvStore`, using a `deadpool-redis` connection pool.
pub struct RedisStore {
    pool: Pool,
    key_prefix: String,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}

impl RedisStore {
    /// Create a new Redis store from configuration. Returns `None` if the
    /// pool cannot be built or the initial connection fails; callers that
    /// want fail-open behavior from the start should fall back to
    /// `MemoryStore` in that case rather than propagate an error.
    pub async fn new(config: RedisConfig) -> Option<Self> {
        let cfg = Config::from_url(&config.url);
        let pool = match cfg.create_pool(Some(Runtime::Tokio1)) {
            Ok(pool) => pool,
            Err(err) => {
                tracing::warn!(error = %err, "failed to build redis connection pool");
                return None;
            }
        };

        if let Err(err) = pool.get().await {
            tracing::warn!(error = %err, "redis store unreachable at construction");
            return None;
        }

        Some(Self {
            pool,
            key_prefix: config.key_prefix,
        })
    }

    /// Create a new Redis store from a URL.
    pub async fn from_url(url: impl Into<String>) -> Option<Self> {
        Self::new(RedisConfig::new(url)).await
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, %key, "redis pool exhausted on get, treating as miss");
                return None;
            }
        };

        let full_key = self.full_key(key);
        match conn.get::<_, Option<Vec<u8>>>(&full_key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, %key, "redis get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, %key, "redis pool exhausted on set, dropping write");
                return;
            }
        };

        let full_key = self.full_key(key);
        let result = match ttl {
            Some(ttl) if !ttl.is_zero() => {
                conn.set_ex::<_, _, ()>(&full_key, value, ttl.as_secs().max(1))
                    .await
            }
            _ => conn.set::<_, _, ()>(&full_key, value).await,
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, %key, "redis set failed, dropping write");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = match self.pool.get().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, %key, "redis pool exhausted on delete, dropping");
                return;
            }
        };

        let full_key = self.full_key(key);
        if let Err(err) = conn.del::<_, ()>(&full_key).await {
            tracing::warn!(error = %err, %key, "redis delete failed, dropping");
        }
    }
}
