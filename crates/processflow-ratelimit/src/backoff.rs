//! Failure classification and retry delays

use crate::config::QuotaConfig;
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Case-insensitive markers that identify a quota failure in an error message
pub const QUOTA_ERROR_MARKERS: &[&str] = &["429", "exhausted", "rate limit"];

/// Whether an error reports quota exhaustion
///
/// The check looks at the rendered message only, so any error type that
/// mentions HTTP 429, an exhausted resource or a rate limit qualifies.
///
/// ```
/// use processflow_ratelimit::is_quota_error;
///
/// assert!(is_quota_error("HTTP 429: Too Many Requests"));
/// assert!(is_quota_error("Resource has been EXHAUSTED"));
/// assert!(!is_quota_error("connection reset by peer"));
/// ```
pub fn is_quota_error<E: fmt::Display + ?Sized>(err: &E) -> bool {
    let message = err.to_string().to_lowercase();
    QUOTA_ERROR_MARKERS.iter().any(|marker| message.contains(marker))
}

/// How a failed attempt is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The service reported quota exhaustion
    Quota,
    /// Any other failure
    Transient,
}

/// Delay schedule between attempts
///
/// Quota failures back off exponentially with jitter. Other failures wait a
/// fixed short delay.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    base: f64,
    cap: Duration,
    jitter_cap: Duration,
    transient_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&QuotaConfig::default())
    }
}

impl BackoffPolicy {
    /// Create a policy from explicit constants
    pub fn new(base: f64, cap: Duration, jitter_cap: Duration, transient_delay: Duration) -> Self {
        Self {
            base,
            cap,
            jitter_cap,
            transient_delay,
        }
    }

    /// Create a policy from the backoff fields of a quota configuration
    pub fn from_config(config: &QuotaConfig) -> Self {
        Self::new(
            config.backoff_base,
            config.backoff_cap(),
            config.jitter_cap(),
            config.transient_retry_delay(),
        )
    }

    /// Classify a failure
    pub fn classify<E: fmt::Display + ?Sized>(&self, err: &E) -> FailureKind {
        if is_quota_error(err) {
            FailureKind::Quota
        } else {
            FailureKind::Transient
        }
    }

    /// Exponential part of the quota delay after `attempt` failures, capped
    pub fn exponential(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(64) as i32;
        let secs = self.base.powi(exponent).min(self.cap.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Delay before the next attempt after the `attempt`-th failure
    pub fn delay(&self, kind: FailureKind, attempt: u32) -> Duration {
        self.delay_with_rng(kind, attempt, &mut rand::thread_rng())
    }

    /// [`delay`](Self::delay) with a caller-supplied random source
    ///
    /// Quota failures wait `min(cap, base^attempt + U[0, min(base^attempt, jitter_cap)))`.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, kind: FailureKind, attempt: u32, rng: &mut R) -> Duration {
        match kind {
            FailureKind::Transient => self.transient_delay,
            FailureKind::Quota => {
                let exponential = self.exponential(attempt).as_secs_f64();
                let jitter_max = exponential.min(self.jitter_cap.as_secs_f64());
                let jitter = if jitter_max > 0.0 {
                    rng.gen_range(0.0..jitter_max)
                } else {
                    0.0
                };
                Duration::from_secs_f64((exponential + jitter).min(self.cap.as_secs_f64()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_quota_markers() {
        assert!(is_quota_error("HTTP 429: slow down"));
        assert!(is_quota_error("Resource has been exhausted (e.g. check quota)."));
        assert!(is_quota_error("Rate Limit reached"));
        assert!(!is_quota_error("HTTP 500: internal error"));
        assert!(!is_quota_error("invalid JSON"));
    }

    #[test]
    fn test_classify() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.classify("HTTP 429"), FailureKind::Quota);
        assert_eq!(policy.classify("timeout"), FailureKind::Transient);
    }

    #[test]
    fn test_transient_delay_is_fixed() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(FailureKind::Transient, 1), Duration::from_secs(1));
        assert_eq!(policy.delay(FailureKind::Transient, 7), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_growth_and_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.exponential(0), Duration::from_secs(1));
        assert_eq!(policy.exponential(1), Duration::from_secs(2));
        assert_eq!(policy.exponential(3), Duration::from_secs(8));
        assert_eq!(policy.exponential(9), Duration::from_secs(300));
        assert_eq!(policy.exponential(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_quota_delay_is_deterministic_with_seed() {
        let policy = BackoffPolicy::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(
            policy.delay_with_rng(FailureKind::Quota, 3, &mut a),
            policy.delay_with_rng(FailureKind::Quota, 3, &mut b)
        );
    }

    #[test]
    fn test_zero_jitter_cap() {
        let policy = BackoffPolicy::new(2.0, Duration::from_secs(300), Duration::ZERO, Duration::from_secs(1));
        assert_eq!(policy.delay(FailureKind::Quota, 2), Duration::from_secs(4));
    }

    proptest! {
        #[test]
        fn prop_quota_delay_bounds(attempt in 0u32..=8, seed in any::<u64>()) {
            let policy = BackoffPolicy::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let wait = policy.delay_with_rng(FailureKind::Quota, attempt, &mut rng).as_secs_f64();
            let exponential = 2f64.powi(attempt as i32);

            prop_assert!(wait >= exponential);
            prop_assert!(wait <= (exponential + 10.0).min(300.0));
        }
    }
}
