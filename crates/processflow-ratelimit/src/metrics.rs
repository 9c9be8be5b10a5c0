//! Metrics collection for call execution

use crate::backoff::FailureKind;
use std::time::Duration;

/// Counters collected by the call executor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorMetrics {
    /// Operation invocations
    pub attempts: u64,

    /// Invocations that succeeded
    pub successes: u64,

    /// Failures classified as quota exhaustion
    pub quota_failures: u64,

    /// Failures of any other kind
    pub transient_failures: u64,

    /// Calls that ran out of retries
    pub exhausted: u64,

    /// Times the ledger made a request wait
    pub quota_waits: u64,

    /// Total time spent waiting on the ledger
    pub quota_wait_time: Duration,

    /// Total time spent in backoff sleeps
    pub backoff_time: Duration,
}

impl ExecutorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an operation invocation
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Record a successful invocation
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    /// Record a failed invocation
    pub fn record_failure(&mut self, kind: FailureKind) {
        match kind {
            FailureKind::Quota => self.quota_failures += 1,
            FailureKind::Transient => self.transient_failures += 1,
        }
    }

    /// Record a call that gave up after its last attempt
    pub fn record_exhausted(&mut self) {
        self.exhausted += 1;
    }

    /// Record a ledger wait
    pub fn record_quota_wait(&mut self, wait: Duration) {
        self.quota_waits += 1;
        self.quota_wait_time += wait;
    }

    /// Record a backoff sleep
    pub fn record_backoff(&mut self, wait: Duration) {
        self.backoff_time += wait;
    }

    /// Total failed invocations
    pub fn total_failures(&self) -> u64 {
        self.quota_failures + self.transient_failures
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Call Executor Metrics".to_string(),
            "=====================".to_string(),
            format!("Attempts: {}", self.attempts),
            format!("Successes: {}", self.successes),
            format!(
                "Failures: {} (quota: {}, other: {})",
                self.total_failures(),
                self.quota_failures,
                self.transient_failures
            ),
            format!("Exhausted retries: {}", self.exhausted),
            format!(
                "Quota waits: {} ({:.1}s)",
                self.quota_waits,
                self.quota_wait_time.as_secs_f64()
            ),
            format!("Backoff time: {:.1}s", self.backoff_time.as_secs_f64()),
        ];
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counting() {
        let mut metrics = ExecutorMetrics::new();
        metrics.record_attempt();
        metrics.record_failure(FailureKind::Quota);
        metrics.record_backoff(Duration::from_secs(2));
        metrics.record_attempt();
        metrics.record_failure(FailureKind::Transient);
        metrics.record_attempt();
        metrics.record_success();
        metrics.record_quota_wait(Duration::from_secs(30));

        assert_eq!(metrics.attempts, 3);
        assert_eq!(metrics.successes, 1);
        assert_eq!(metrics.total_failures(), 2);
        assert_eq!(metrics.quota_wait_time, Duration::from_secs(30));
        assert_eq!(metrics.backoff_time, Duration::from_secs(2));
    }

    #[test]
    fn test_metrics_summary() {
        let mut metrics = ExecutorMetrics::new();
        metrics.record_attempt();
        metrics.record_success();

        let summary = metrics.summary();
        assert!(summary.contains("Attempts: 1"));
        assert!(summary.contains("Successes: 1"));
        assert!(summary.contains("Failures: 0"));
    }

    #[test]
    fn test_metrics_reset() {
        let mut metrics = ExecutorMetrics::new();
        metrics.record_attempt();
        metrics.record_exhausted();
        metrics.reset();
        assert_eq!(metrics, ExecutorMetrics::default());
    }
}
