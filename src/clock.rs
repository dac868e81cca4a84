//! Time source abstraction for the algorithm layer.
//!
//! Every algorithm reads "now" through this trait instead of calling
//! `SystemTime::now()` directly, so that tests can pin exact fractional-second
//! instants instead of sleeping in real time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of the current time, in fractional seconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    /// Current time in seconds since the Unix epoch.
    fn now_seconds(&self) -> f64;
}

/// Wall-clock time via `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch")
            .as_secs_f64()
    }
}

/// A settable clock for deterministic tests.
///
/// Stores time as whole microseconds so the clock is `Send + Sync` without
/// locking; fractional-second precision (the scenarios this engine is tested
/// against use tenths of a second) survives the round trip intact.
#[derive(Debug)]
pub struct FakeClock {
    micros: AtomicU64,
}

impl FakeClock {
    /// Create a fake clock starting at `t = 0`.
    pub fn new() -> Self {
        Self {
            micros: AtomicU64::new(0),
        }
    }

    /// Create a fake clock starting at the given time, in seconds.
    pub fn at(seconds: f64) -> Self {
        let clock = Self::new();
        clock.set(seconds);
        clock
    }

    /// Set the clock to an absolute time, in seconds since epoch.
    pub fn set(&self, seconds: f64) {
        self.micros.store(to_micros(seconds), Ordering::SeqCst);
    }

    /// Advance the clock by the given number of seconds.
    pub fn advance(&self, seconds: f64) {
        let delta = to_micros(seconds);
        self.micros.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now_seconds(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}

fn to_micros(seconds: f64) -> u64 {
    (seconds * 1_000_000.0).round() as u64
}
