//! In-memory storage with automatic garbage collection.
//!
//! Uses `DashMap` for thread-safe concurrent access and includes configurable
//! garbage collection to prevent unbounded memory growth from abandoned keys.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::storage::{current_timestamp_ms, KvStore};

/// Garbage collection interval configuration.
#[derive(Debug, Clone)]
pub enum GcInterval {
    /// Run GC every N requests.
    Requests(u64),
    /// Run GC at fixed time intervals.
    Duration(Duration),
    /// Disable automatic GC.
    Manual,
}

impl Default for GcInterval {
    fn default() -> Self {
        Self::Requests(10000)
    }
}

/// Garbage collection configuration.
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// When to trigger GC.
    pub interval: GcInterval,
    /// Maximum age of entries before cleanup (default: 1 hour), used as a
    /// backstop for keys whose TTL bookkeeping has drifted.
    pub max_age: Duration,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval: GcInterval::default(),
            max_age: Duration::from_secs(3600),
        }
    }
}

impl GcConfig {
    /// Create config with request-based GC.
    pub fn on_requests(count: u64) -> Self {
        Self {
            interval: GcInterval::Requests(count),
            ..Default::default()
        }
    }

    /// Create config with time-based GC.
    pub fn on_duration(interval: Duration) -> Self {
        Self {
            interval: GcInterval::Duration(interval),
            ..Default::default()
        }
    }

    /// Create config with manual GC only.
    pub fn manual() -> Self {
        Self {
            interval: GcInterval::Manual,
            ..Default::default()
        }
    }

    /// Set the maximum age for entries.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// Internal entry with expiration tracking. `expires_at = 0` means "no TTL".
#[derive(Debug, Clone)]
struct InternalEntry {
    value: Vec<u8>,
    expires_at: u64,
    stored_at: u64,
}

/// In-memory key-value store with garbage collection.
pub struct MemoryStore {
    data: DashMap<String, InternalEntry>,
    gc_config: GcConfig,
    request_count: AtomicU64,
    gc_lock: Mutex<()>,
    shutdown: Arc<Notify>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.data.len())
            .field("gc_config", &self.gc_config)
            .finish()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new memory store with default GC configuration.
    pub fn new() -> Self {
        Self::with_gc(GcConfig::default())
    }

    /// Create a new memory store with custom GC configuration.
    pub fn with_gc(gc_config: GcConfig) -> Self {
        let store = Self {
            data: DashMap::new(),
            gc_config: gc_config.clone(),
            request_count: AtomicU64::new(0),
            gc_lock: Mutex::new(()),
            shutdown: Arc::new(Notify::new()),
        };

        if let GcInterval::Duration(interval) = gc_config.interval {
            store.start_gc_task(interval);
        }

        store
    }

    fn start_gc_task(&self, interval: Duration) {
        let data = self.data.clone();
        let max_age = self.gc_config.max_age;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        run_gc_on_map(&data, max_age);
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });
    }

    /// Manually trigger garbage collection.
    pub async fn run_gc(&self) {
        run_gc_on_map(&self.data, self.gc_config.max_age);
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.data.clear();
    }

    fn maybe_run_gc(&self) {
        if let GcInterval::Requests(threshold) = self.gc_config.interval {
            let count = self.request_count.fetch_add(1, Ordering::Relaxed);
            if threshold > 0 && count % threshold == 0 && count > 0 {
                if let Some(_guard) = self.gc_lock.try_lock() {
                    run_gc_on_map(&self.data, self.gc_config.max_age);
                }
            }
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

fn run_gc_on_map(data: &DashMap<String, InternalEntry>, max_age: Duration) {
    let now = current_timestamp_ms();
    let max_age_ms = max_age.as_millis() as u64;
    let cutoff = now.saturating_sub(max_age_ms);

    data.retain(|_, entry| {
        let ttl_alive = entry.expires_at == 0 || entry.expires_at > now;
        ttl_alive && entry.stored_at > cutoff
    });
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.maybe_run_gc();

        let now = current_timestamp_ms();
        if let Some(entry) = self.data.get(key) {
            if entry.expires_at == 0 || entry.expires_at > now {
                return Some(entry.value.clone());
            }
            drop(entry);
            self.data.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        self.maybe_run_gc();

        let now = current_timestamp_ms();
        let expires_at = match ttl {
            Some(d) if !d.is_zero() => now + d.as_millis() as u64,
            _ => 0,
        };

        self.data.insert(
            key.to_string(),
            InternalEntry {
                value,
                expires_at,
                stored_at: now,
            },
        );
    }

    async fn delete(&self, key: &str) {
        self.data.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_value() {
        let store = MemoryStore::new();
        store
            .set("key1", b"hello".to_vec(), Some(Duration::from_secs(60)))
            .await;

        let result = store.get("key1").await;
        assert_eq!(result, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let store = MemoryStore::new();
        store
            .set("key1", b"hello".to_vec(), Some(Duration::from_millis(10)))
            .await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get("key1").await, None);
    }

    #[tokio::test]
    async fn no_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("key1", b"hello".to_vec(), None).await;
        assert_eq!(store.get("key1").await, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn delete_removes_the_key() {
        let store = MemoryStore::new();
        store.set("key1", b"hello".to_vec(), None).await;
        store.delete("key1").await;
        assert_eq!(store.get("key1").await, None);
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("absent").await, None);
    }

    #[test]
    fn gc_config_builder() {
        let config = GcConfig::on_requests(1000).with_max_age(Duration::from_secs(3600));
        assert!(matches!(config.interval, GcInterval::Requests(1000)));
        assert_eq!(config.max_age, Duration::from_secs(3600));
    }
}
