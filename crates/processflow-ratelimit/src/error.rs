//! Error types for quota accounting and call execution

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the quota ledger and configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuotaError {
    /// A single request needs more tokens than the per-minute ceiling allows,
    /// so no amount of waiting can admit it
    #[error("Request needs {requested} tokens but the per-minute limit is {limit}")]
    RequestExceedsTokenLimit {
        /// Tokens the request expects to use
        requested: u64,
        /// Configured tokens-per-minute ceiling
        limit: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

/// Errors returned by the call executor
///
/// `E` is the error type of the wrapped operation. The last underlying error
/// is always carried when retries run out.
#[derive(Error, Debug)]
pub enum ExecutorError<E> {
    /// A quota wait was required but does not fit in the caller's deadline
    #[error("Quota wait of {wait:?} exceeds the remaining time budget")]
    QuotaExceeded {
        /// Wait that would have been needed
        wait: Duration,
    },

    /// The service kept reporting quota exhaustion until retries ran out
    #[error("Rate limit exceeded after {attempts} attempts: {source}")]
    RateLimitExceeded {
        /// Attempts made
        attempts: u32,
        /// Last error returned by the operation
        source: E,
    },

    /// The operation kept failing until retries ran out
    #[error("Operation failed after {attempts} attempts: {source}")]
    OperationFailed {
        /// Attempts made
        attempts: u32,
        /// Last error returned by the operation
        source: E,
    },

    /// The caller's deadline passed while the operation was in flight
    #[error("Deadline elapsed before the call completed")]
    DeadlineElapsed,

    /// The request can never be admitted
    #[error(transparent)]
    Quota(#[from] QuotaError),
}

impl<E> ExecutorError<E> {
    /// Attempts made before giving up, when the operation was invoked
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ExecutorError::RateLimitExceeded { attempts, .. }
            | ExecutorError::OperationFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Whether the failure is due to quota exhaustion (local or remote)
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            ExecutorError::QuotaExceeded { .. } | ExecutorError::RateLimitExceeded { .. }
        )
    }

    /// The last underlying error, if the operation was invoked
    pub fn into_source(self) -> Option<E> {
        match self {
            ExecutorError::RateLimitExceeded { source, .. }
            | ExecutorError::OperationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
