//! Rate limiting algorithm trait and implementations.
//!
//! Each algorithm is a stateless object parameterized by its limits; state
//! lives entirely in the store, keyed by algorithm tag and composite key, so
//! that switching `algorithm_type` for a `unique_id` never silently inherits
//! another algorithm's counters (§3 invariant 7).
//!
//! # Available Algorithms
//!
//! - **Token Bucket**: controlled bursts with refilling tokens
//! - **Fixed Window**: simple counter per aligned time window
//! - **Sliding Window**: weighted-by-timestamp window for smoother limits
//! - **Leaky Bucket**: smooth, constant-rate drain
//! - **Multiple Buckets**: token bucket + sliding window + leaky bucket combined

mod fixed_window;
mod leaky_bucket;
mod multi_bucket;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindow;
pub use leaky_bucket::LeakyBucket;
pub use multi_bucket::MultipleBuckets;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

use std::future::Future;
use std::time::Duration;

use crate::config::AlgorithmTag;
use crate::decision::Verdict;
use crate::storage::KvStore;

const KEY_PREFIX: &str = "safety_chat:rate_limiter";

/// Rate limiting algorithm contract.
///
/// The canonical implementation pattern (§4.2): `get_status` reads state,
/// recomputes continuous quantities as of `now`, and derives the verdict —
/// it is the single source of truth for the verdict shape and must not
/// mutate anything. `check` calls `get_status`; if allowed, it re-reads
/// state, applies the discrete consumption, and writes the new state with
/// its TTL. The read-decide-write sequence is not atomic at this layer
/// (§5); that is an accepted property of the design, not an oversight.
pub trait RateLimitAlgorithm: Send + Sync + 'static {
    /// The algorithm tag this instance implements.
    fn tag(&self) -> AlgorithmTag;

    /// Check whether a request is allowed and, if so, record it.
    fn check<S: KvStore>(&self, store: &S, key: &str) -> impl Future<Output = Verdict> + Send;

    /// Read the current state without mutating it.
    fn get_status<S: KvStore>(&self, store: &S, key: &str) -> impl Future<Output = Verdict> + Send;
}

/// A TTL in seconds, clamped to a minimum of 1 to avoid the zero/negative
/// TTLs the source's arithmetic can produce at rate/window boundaries (§9
/// Open Questions).
fn clamp_ttl(seconds: i64) -> Duration {
    Duration::from_secs(seconds.max(1) as u64)
}

fn storage_key(tag: AlgorithmTag, composite_key: &str) -> String {
    format!("{KEY_PREFIX}:{}:{composite_key}", tag.as_str())
}
