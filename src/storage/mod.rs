//! Storage backend trait and implementations.
//!
//! This module defines the `KvStore` trait that all storage backends must
//! implement, along with built-in implementations for in-memory, Redis, and
//! host-provided key-value stores.

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "redis")]
mod redis_store;
mod host;

#[cfg(feature = "memory")]
pub use memory::{GcConfig, GcInterval, MemoryStore};

#[cfg(feature = "redis")]
pub use redis_store::{RedisConfig, RedisStore};

pub use host::{HostKv, HostKvStore};

use std::future::Future;
use std::time::Duration;

/// Opaque key-value store backing algorithm state and configuration records.
///
/// All three operations are fail-open: a backend error is never surfaced to
/// the caller. `get` treats an error the same as a miss; `set`/`delete` treat
/// an error as a silent no-op. This is deliberate (§4.1/§7): a store outage
/// must never block admission, only degrade it to "as if the limiter had
/// never run".
///
/// There is no atomic read-modify-write primitive here. The algorithm layer
/// performs its own read-decide-write sequence, accepting the drift that
/// follows from concurrent callers sharing a key.
pub trait KvStore: Send + Sync + 'static {
    /// Get the value stored for `key`, or `None` if absent, expired, or the
    /// backend failed.
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Store `value` for `key`. When `ttl` is `Some` and positive, the key
    /// becomes absent after that many seconds.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = ()> + Send;

    /// Remove `key`. A no-op if the key does not exist.
    fn delete(&self, key: &str) -> impl Future<Output = ()> + Send;
}

impl<S: KvStore + ?Sized> KvStore for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) {
        (**self).delete(key).await
    }
}

/// Current Unix timestamp in milliseconds, used by backends for expiry math.
pub(crate) fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}
