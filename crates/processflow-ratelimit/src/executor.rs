//! Call executor
//!
//! Wraps a fallible async operation with quota admission, usage accounting,
//! failure classification and bounded retries. Every generation call in the
//! pipeline goes through a single executor so its ledger sees all traffic.

use crate::backoff::{BackoffPolicy, FailureKind};
use crate::config::QuotaConfig;
use crate::error::{ExecutorError, QuotaError};
use crate::ledger::{Admission, QuotaDimension, QuotaLedger, UsageSnapshot};
use crate::metrics::ExecutorMetrics;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Utilization (percent) above which usage is reported as critical
const CRITICAL_USAGE_PCT: f64 = 90.0;

/// Utilization (percent) above which usage is reported as high
const HIGH_USAGE_PCT: f64 = 75.0;

/// One invocation of the wrapped operation
#[derive(Debug, Clone, PartialEq)]
pub struct CallAttempt {
    /// 1-based attempt number
    pub index: u32,
    /// Total attempts allowed for this call
    pub max_attempts: u32,
    /// Message of the failure that caused this retry
    pub previous_error: Option<String>,
    /// Time waited before this attempt (quota wait plus backoff)
    pub wait: Duration,
}

impl fmt::Display for CallAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt {} of {}", self.index, self.max_attempts)?;
        if !self.wait.is_zero() {
            write!(f, " after {:.2}s", self.wait.as_secs_f64())?;
        }
        if let Some(previous) = &self.previous_error {
            write!(f, " (previous error: {})", previous)?;
        }
        Ok(())
    }
}

/// Rate-limited, retrying executor for generation calls
///
/// The executor is shared by reference. Attempts are serialized: a caller
/// holds the attempt gate from admission until its usage is recorded, so
/// concurrent callers never pass the same admission check. The gate is
/// released before backoff sleeps. The ledger lock itself is never held
/// across an await.
///
/// # Examples
///
/// ```
/// use processflow_ratelimit::{CallExecutor, QuotaConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let executor = CallExecutor::new(QuotaConfig::default()).unwrap();
/// let result: Result<u32, _> = executor
///     .execute(|| async { Ok::<_, std::io::Error>(42) }, 100)
///     .await;
/// assert_eq!(result.unwrap(), 42);
/// assert_eq!(executor.usage().calls_this_minute, 1);
/// # }
/// ```
#[derive(Debug)]
pub struct CallExecutor {
    config: QuotaConfig,
    backoff: BackoffPolicy,
    gate: tokio::sync::Mutex<()>,
    ledger: Mutex<QuotaLedger>,
    metrics: Mutex<ExecutorMetrics>,
}

impl CallExecutor {
    /// Create an executor with the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: QuotaConfig) -> Result<Self, QuotaError> {
        Ok(Self {
            backoff: BackoffPolicy::from_config(&config),
            gate: tokio::sync::Mutex::new(()),
            ledger: Mutex::new(QuotaLedger::new(&config)?),
            metrics: Mutex::new(ExecutorMetrics::new()),
            config,
        })
    }

    /// Replace the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Current quota usage
    pub fn usage(&self) -> UsageSnapshot {
        self.ledger().usage(Instant::now())
    }

    /// Snapshot of the collected metrics
    pub fn metrics(&self) -> ExecutorMetrics {
        self.metrics_mut().clone()
    }

    /// Forget recorded usage and metrics
    pub fn reset(&self) {
        self.ledger().reset();
        self.metrics_mut().reset();
    }

    /// Run `operation` with the configured retry budget
    ///
    /// `expected_tokens` is charged against the per-minute token ceiling when
    /// the operation succeeds. Failed attempts are never charged.
    ///
    /// # Errors
    ///
    /// - [`ExecutorError::Quota`] if the request can never be admitted
    /// - [`ExecutorError::RateLimitExceeded`] if the last failure was a quota failure
    /// - [`ExecutorError::OperationFailed`] for any other last failure
    pub async fn execute<T, E, F, Fut>(&self, operation: F, expected_tokens: u64) -> Result<T, ExecutorError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(operation, expected_tokens, self.config.max_retries, None).await
    }

    /// Run `operation` with an explicit retry budget
    pub async fn execute_with_retries<T, E, F, Fut>(
        &self,
        operation: F,
        expected_tokens: u64,
        max_retries: u32,
    ) -> Result<T, ExecutorError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(operation, expected_tokens, max_retries, None).await
    }

    /// Run `operation` but give up when `budget` would be exceeded
    ///
    /// # Errors
    ///
    /// In addition to the [`execute`](Self::execute) errors:
    /// - [`ExecutorError::QuotaExceeded`] when a ledger wait does not fit in the budget
    /// - [`ExecutorError::RateLimitExceeded`] or [`ExecutorError::OperationFailed`]
    ///   with the last failure when the next backoff does not fit
    /// - [`ExecutorError::DeadlineElapsed`] when the budget runs out mid-call
    pub async fn execute_with_deadline<T, E, F, Fut>(
        &self,
        operation: F,
        expected_tokens: u64,
        budget: Duration,
    ) -> Result<T, ExecutorError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let deadline = Instant::now() + budget;
        self.run(operation, expected_tokens, self.config.max_retries, Some(deadline))
            .await
    }

    async fn run<T, E, F, Fut>(
        &self,
        mut operation: F,
        expected_tokens: u64,
        max_retries: u32,
        deadline: Option<Instant>,
    ) -> Result<T, ExecutorError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = max_retries.saturating_add(1);
        let mut previous_error: Option<String> = None;
        let mut backoff_wait = Duration::ZERO;
        let mut index = 0;

        loop {
            index += 1;
            let gate = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, self.gate.lock())
                    .await
                    .map_err(|_| ExecutorError::DeadlineElapsed)?,
                None => self.gate.lock().await,
            };
            let quota_wait = self.wait_for_admission::<E>(expected_tokens, deadline).await?;

            let attempt = CallAttempt {
                index,
                max_attempts,
                previous_error: previous_error.take(),
                wait: backoff_wait + quota_wait,
            };
            debug!("Executing call, {}", attempt);
            self.metrics_mut().record_attempt();

            let outcome = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, operation())
                    .await
                    .map_err(|_| ExecutorError::DeadlineElapsed)?,
                None => operation().await,
            };

            let err = match outcome {
                Ok(value) => {
                    let usage = {
                        let now = Instant::now();
                        let mut ledger = self.ledger();
                        ledger.record(now, expected_tokens);
                        ledger.usage(now)
                    };
                    self.metrics_mut().record_success();
                    log_usage(&usage);
                    return Ok(value);
                }
                Err(err) => err,
            };
            drop(gate);

            let kind = self.backoff.classify(&err);
            self.metrics_mut().record_failure(kind);

            if index >= max_attempts {
                error!("Failed after {} attempts. Last error: {}", index, err);
                self.metrics_mut().record_exhausted();
                return Err(match kind {
                    FailureKind::Quota => ExecutorError::RateLimitExceeded {
                        attempts: index,
                        source: err,
                    },
                    FailureKind::Transient => ExecutorError::OperationFailed {
                        attempts: index,
                        source: err,
                    },
                });
            }

            let delay = self.backoff.delay(kind, index);
            match kind {
                FailureKind::Quota => warn!(
                    "Rate limit exceeded. Retrying in {:.2} seconds... (Attempt {} of {})",
                    delay.as_secs_f64(),
                    index,
                    max_attempts
                ),
                FailureKind::Transient => warn!(
                    "Error occurred: {}. Retrying in {:.2} seconds... (Attempt {} of {})",
                    err,
                    delay.as_secs_f64(),
                    index,
                    max_attempts
                ),
            }

            if let Some(deadline) = deadline {
                if Instant::now() + delay > deadline {
                    error!(
                        "Retry after {:.2}s would pass the deadline. Last error: {}",
                        delay.as_secs_f64(),
                        err
                    );
                    self.metrics_mut().record_exhausted();
                    return Err(match kind {
                        FailureKind::Quota => ExecutorError::RateLimitExceeded {
                            attempts: index,
                            source: err,
                        },
                        FailureKind::Transient => ExecutorError::OperationFailed {
                            attempts: index,
                            source: err,
                        },
                    });
                }
            }

            tokio::time::sleep(delay).await;
            self.metrics_mut().record_backoff(delay);
            previous_error = Some(err.to_string());
            backoff_wait = delay;
        }
    }

    /// Sleep until the ledger admits the request, returning the time waited
    ///
    /// Re-checks after every sleep because other calls may have been
    /// recorded in the meantime.
    async fn wait_for_admission<E>(
        &self,
        expected_tokens: u64,
        deadline: Option<Instant>,
    ) -> Result<Duration, ExecutorError<E>> {
        let mut waited = Duration::ZERO;
        loop {
            let now = Instant::now();
            let admission = self.ledger().check(now, expected_tokens)?;

            let (wait, dimension) = match admission {
                Admission::Admit => return Ok(waited),
                Admission::Wait { wait, dimension } => (wait, dimension),
            };

            if let Some(deadline) = deadline {
                if now + wait > deadline {
                    warn!("{} limit requires a {:.2}s wait past the deadline", dimension, wait.as_secs_f64());
                    return Err(ExecutorError::QuotaExceeded { wait });
                }
            }

            match dimension {
                QuotaDimension::CallsPerDay => error!(
                    "Daily call limit reached. Waiting {:.2} seconds...",
                    wait.as_secs_f64()
                ),
                _ => info!(
                    "{} limit reached. Waiting {:.2} seconds...",
                    dimension,
                    wait.as_secs_f64()
                ),
            }

            self.metrics_mut().record_quota_wait(wait);
            tokio::time::sleep(wait).await;
            waited += wait;
        }
    }

    fn ledger(&self) -> MutexGuard<'_, QuotaLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_mut(&self) -> MutexGuard<'_, ExecutorMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_usage(usage: &UsageSnapshot) {
    let peak = usage.peak_utilization();
    if peak > CRITICAL_USAGE_PCT {
        warn!("Critical API usage: {}", usage);
    } else if peak > HIGH_USAGE_PCT {
        warn!("High API usage: {}", usage);
    } else {
        debug!("Current API usage: {}", usage);
    }
}
