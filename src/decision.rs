//! The uniform result type returned by `check` and `get_status`.

use serde::{Deserialize, Serialize};

/// Closed set of denial reason codes.
///
/// `rate_ok` is used for admitted requests; the rest identify which
/// sub-limit denied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Request admitted.
    RateOk,
    /// Token bucket has no tokens available.
    RateNoTokens,
    /// Fixed window request count exhausted.
    RateMaxReq,
    /// Sliding window request count exhausted.
    RateWindow,
    /// Leaky bucket queue is full.
    RateQueueFull,
    /// Composite "multiple buckets" denial.
    RateMulti,
}

impl ReasonCode {
    /// The wire tag used in external responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonCode::RateOk => "rate_ok",
            ReasonCode::RateNoTokens => "rate_no_tokens",
            ReasonCode::RateMaxReq => "rate_max_req",
            ReasonCode::RateWindow => "rate_window",
            ReasonCode::RateQueueFull => "rate_queue_full",
            ReasonCode::RateMulti => "rate_multi",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured result of `check` or `get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// Lower bound on additional units admissible immediately after this call.
    pub remaining: u64,
    /// Epoch seconds at which `remaining` is expected to recover.
    pub reset_time: i64,
    /// English denial text (empty when allowed).
    pub reason: String,
    /// Chinese denial text (empty when allowed).
    pub reason_cn: String,
    /// Denial reason code; `rate_ok` when allowed.
    pub reason_code: ReasonCode,
}

impl Verdict {
    /// Build an admitted verdict.
    pub fn allowed(remaining: u64, reset_time: i64) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_time,
            reason: String::new(),
            reason_cn: String::new(),
            reason_code: ReasonCode::RateOk,
        }
    }

    /// Build a denied verdict.
    pub fn denied(
        remaining: u64,
        reset_time: i64,
        reason: String,
        reason_cn: String,
        reason_code: ReasonCode,
    ) -> Self {
        Self {
            allowed: false,
            remaining,
            reset_time,
            reason,
            reason_cn,
            reason_code,
        }
    }
}
