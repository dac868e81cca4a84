//! Error types for the limiter service.
//!
//! Only validation failures are caller-visible (§7): store errors are
//! swallowed inside the `KvStore` layer and never surface here.

use thiserror::Error;

/// Result type for limiter service operations.
pub type Result<T> = std::result::Result<T, RateLimitError>;

/// Caller-visible errors from the limiter service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// A required parameter was missing or empty.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// An `algorithm_type` value outside the closed set of five tags.
    #[error("unsupported algorithm type: {0}")]
    UnknownAlgorithm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_message() {
        let err = RateLimitError::MissingParameter("user_id");
        assert_eq!(err.to_string(), "missing required parameter: user_id");
    }

    #[test]
    fn unknown_algorithm_message() {
        let err = RateLimitError::UnknownAlgorithm("gcra".into());
        assert_eq!(err.to_string(), "unsupported algorithm type: gcra");
    }
}
