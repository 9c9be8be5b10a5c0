//! ProcessFlow Rate Limiting
//!
//! Quota-aware execution of generation calls against a metered service.
//!
//! # Overview
//!
//! - **Quota ledger**: rolling per-minute call and token windows plus a
//!   rolling per-day call window, charged only for successful calls
//! - **Backoff policy**: exponential backoff with jitter after quota failures,
//!   a short fixed delay after any other failure
//! - **Call executor**: waits for admission, invokes the operation, classifies
//!   failures and retries up to a fixed budget
//!
//! # Usage
//!
//! ```
//! use processflow_ratelimit::{CallExecutor, ExecutorError, QuotaConfig};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let executor = CallExecutor::new(QuotaConfig::free_tier().with_max_retries(0)).unwrap();
//!
//! let result: Result<String, ExecutorError<String>> = executor
//!     .execute(|| async { Err("HTTP 429: quota exhausted".to_string()) }, 500)
//!     .await;
//!
//! assert!(result.unwrap_err().is_rate_limited());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backoff;
pub mod config;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod metrics;

pub use backoff::{is_quota_error, BackoffPolicy, FailureKind, QUOTA_ERROR_MARKERS};
pub use config::QuotaConfig;
pub use error::{ExecutorError, QuotaError};
pub use executor::{CallAttempt, CallExecutor};
pub use ledger::{Admission, QuotaDimension, QuotaLedger, UsageSnapshot, UsageWindow, DAY, MINUTE};
pub use metrics::ExecutorMetrics;
