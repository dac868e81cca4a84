//! Adapter for a host that only exposes untyped put/get/delete, with no
//! native TTL concept.
//!
//! Wraps every value as `{data, expire_at}` and checks `expire_at` on read,
//! deleting the key and returning a miss once it has passed.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::{current_timestamp_ms, KvStore};

/// The raw capability a host provides: untyped, TTL-less put/get/delete.
pub trait HostKv: Send + Sync + 'static {
    /// Fetch raw bytes for `key`, or `None` if absent or the host failed.
    fn get(&self, key: &str) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Store raw bytes for `key`. Failures are the host's problem; a
    /// `HostKv` implementation should swallow them rather than panic.
    fn put(&self, key: &str, value: Vec<u8>) -> impl Future<Output = ()> + Send;

    /// Remove `key`.
    fn delete(&self, key: &str) -> impl Future<Output = ()> + Send;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    data: Vec<u8>,
    /// Unix milliseconds; `0` means "no expiry".
    expire_at: u64,
}

/// `KvStore` built on top of a host's untyped KV capability.
pub struct HostKvStore<H> {
    host: H,
}

impl<H: HostKv> HostKvStore<H> {
    /// Wrap a host KV capability as a `KvStore`.
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: HostKv> KvStore for HostKvStore<H> {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let raw = self.host.get(key).await?;
        let envelope: Envelope = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, %key, "host kv envelope corrupt, treating as miss");
                return None;
            }
        };

        if envelope.expire_at != 0 && envelope.expire_at <= current_timestamp_ms() {
            self.host.delete(key).await;
            return None;
        }

        Some(envelope.data)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let expire_at = match ttl {
            Some(d) if !d.is_zero() => current_timestamp_ms() + d.as_millis() as u64,
            _ => 0,
        };

        let envelope = Envelope {
            data: value,
            expire_at,
        };

        match serde_json::to_vec(&envelope) {
            Ok(raw) => self.host.put(key, raw).await,
            Err(err) => tracing::warn!(error = %err, %key, "failed to encode host kv envelope"),
        }
    }

    async fn delete(&self, key: &str) {
        self.host.delete(key).await;
    }
}
