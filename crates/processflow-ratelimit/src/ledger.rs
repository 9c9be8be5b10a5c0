//! Rolling-window quota ledger
//!
//! Tracks successful calls and their token cost over the last minute and the
//! last day, and computes how long a new request has to wait before it fits
//! under every ceiling.

use crate::config::QuotaConfig;
use crate::error::QuotaError;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Span of the per-minute windows
pub const MINUTE: Duration = Duration::from_secs(60);

/// Span of the per-day window
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A quota dimension the ledger enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaDimension {
    /// Calls in the rolling minute
    CallsPerMinute,
    /// Tokens in the rolling minute
    TokensPerMinute,
    /// Calls in the rolling day
    CallsPerDay,
}

impl fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuotaDimension::CallsPerMinute => "RPM",
            QuotaDimension::TokensPerMinute => "TPM",
            QuotaDimension::CallsPerDay => "RPD",
        };
        f.write_str(label)
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request fits now
    Admit,
    /// The request fits once `wait` has elapsed
    Wait {
        /// Time until every dimension admits the request
        wait: Duration,
        /// Dimension that imposes the longest wait
        dimension: QuotaDimension,
    },
}

impl Admission {
    /// Wait required before admission (zero when admitted)
    pub fn wait(&self) -> Duration {
        match self {
            Admission::Admit => Duration::ZERO,
            Admission::Wait { wait, .. } => *wait,
        }
    }
}

/// Timestamped amounts inside a fixed rolling span
///
/// Entries stay in chronological order. An entry whose age is at least the
/// span is expired and is dropped by [`prune`](Self::prune).
#[derive(Debug, Clone)]
pub struct UsageWindow {
    span: Duration,
    entries: VecDeque<(Instant, u64)>,
}

impl UsageWindow {
    /// Create an empty window
    pub fn new(span: Duration) -> Self {
        Self {
            span,
            entries: VecDeque::new(),
        }
    }

    /// Window span
    pub fn span(&self) -> Duration {
        self.span
    }

    /// Append an entry
    ///
    /// A timestamp earlier than the newest entry is moved up to it so the
    /// window stays sorted.
    pub fn push(&mut self, at: Instant, amount: u64) {
        let at = match self.entries.back() {
            Some((last, _)) if at < *last => *last,
            _ => at,
        };
        self.entries.push_back((at, amount));
    }

    /// Drop every entry whose age is at least the span
    pub fn prune(&mut self, now: Instant) {
        while let Some((at, _)) = self.entries.front() {
            if now.saturating_duration_since(*at) >= self.span {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all amounts
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, amount)| *amount).sum()
    }

    /// Timestamps and amounts, oldest first
    pub fn entries(&self) -> impl Iterator<Item = (Instant, u64)> + '_ {
        self.entries.iter().copied()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn until_expired(&self, at: Instant, now: Instant) -> Duration {
        (at + self.span).saturating_duration_since(now)
    }

    /// Time until fewer than `limit` entries remain
    ///
    /// Assumes the window is pruned at `now`.
    fn wait_for_count(&self, now: Instant, limit: usize) -> Duration {
        if self.entries.len() < limit {
            return Duration::ZERO;
        }
        // Entries up to and including this index must expire
        let index = self.entries.len() - limit;
        self.entries
            .get(index)
            .map(|(at, _)| self.until_expired(*at, now))
            .unwrap_or(Duration::ZERO)
    }

    /// Time until `extra` more fits under `limit`
    ///
    /// Assumes the window is pruned at `now` and `extra <= limit`.
    fn wait_for_total(&self, now: Instant, limit: u64, extra: u64) -> Duration {
        let mut remaining = self.total();
        if remaining.saturating_add(extra) <= limit {
            return Duration::ZERO;
        }
        for (at, amount) in &self.entries {
            remaining -= amount;
            if remaining.saturating_add(extra) <= limit {
                return self.until_expired(*at, now);
            }
        }
        // Unreachable while extra <= limit: an empty window always fits
        self.entries
            .back()
            .map(|(at, _)| self.until_expired(*at, now))
            .unwrap_or(Duration::ZERO)
    }
}

/// Point-in-time view of quota usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSnapshot {
    /// Calls in the rolling minute
    pub calls_this_minute: usize,
    /// Tokens in the rolling minute
    pub tokens_this_minute: u64,
    /// Calls in the rolling day
    pub calls_today: usize,
    /// Per-minute call ceiling
    pub calls_per_minute_limit: u32,
    /// Per-minute token ceiling
    pub tokens_per_minute_limit: u64,
    /// Per-day call ceiling
    pub calls_per_day_limit: u32,
}

impl UsageSnapshot {
    /// Per-minute call utilization in percent
    pub fn calls_per_minute_pct(&self) -> f64 {
        percent(self.calls_this_minute as f64, f64::from(self.calls_per_minute_limit))
    }

    /// Per-minute token utilization in percent
    pub fn tokens_per_minute_pct(&self) -> f64 {
        percent(self.tokens_this_minute as f64, self.tokens_per_minute_limit as f64)
    }

    /// Per-day call utilization in percent
    pub fn calls_per_day_pct(&self) -> f64 {
        percent(self.calls_today as f64, f64::from(self.calls_per_day_limit))
    }

    /// Highest utilization across all dimensions, in percent
    pub fn peak_utilization(&self) -> f64 {
        self.calls_per_minute_pct()
            .max(self.tokens_per_minute_pct())
            .max(self.calls_per_day_pct())
    }
}

fn percent(used: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        used / limit * 100.0
    } else {
        0.0
    }
}

impl fmt::Display for UsageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RPM {}/{} ({:.1}%), TPM {}/{} ({:.1}%), RPD {}/{} ({:.1}%)",
            self.calls_this_minute,
            self.calls_per_minute_limit,
            self.calls_per_minute_pct(),
            self.tokens_this_minute,
            self.tokens_per_minute_limit,
            self.tokens_per_minute_pct(),
            self.calls_today,
            self.calls_per_day_limit,
            self.calls_per_day_pct(),
        )
    }
}

/// Rolling usage for every quota dimension
///
/// Only successful calls are recorded. The ledger has no interior locking;
/// the call executor wraps it in a mutex.
///
/// # Examples
///
/// ```
/// use processflow_ratelimit::{QuotaConfig, QuotaLedger};
/// use std::time::Duration;
/// use tokio::time::Instant;
///
/// let mut ledger = QuotaLedger::new(&QuotaConfig::default().with_calls_per_minute(1)).unwrap();
/// let now = Instant::now();
/// ledger.record(now, 100);
///
/// let wait = ledger.time_until_admissible(now, 100).unwrap();
/// assert_eq!(wait, Duration::from_secs(60));
/// assert_eq!(ledger.time_until_admissible(now + wait, 100).unwrap(), Duration::ZERO);
/// ```
#[derive(Debug, Clone)]
pub struct QuotaLedger {
    calls_per_minute: u32,
    tokens_per_minute: u64,
    calls_per_day: u32,
    minute_calls: UsageWindow,
    minute_tokens: UsageWindow,
    day_calls: UsageWindow,
}

impl QuotaLedger {
    /// Create an empty ledger with the ceilings from `config`
    ///
    /// # Errors
    ///
    /// [`QuotaError::InvalidConfig`] if `config` fails validation (a zero
    /// ceiling could never be satisfied).
    pub fn new(config: &QuotaConfig) -> Result<Self, QuotaError> {
        config.validate()?;
        Ok(Self {
            calls_per_minute: config.calls_per_minute,
            tokens_per_minute: config.tokens_per_minute,
            calls_per_day: config.calls_per_day,
            minute_calls: UsageWindow::new(MINUTE),
            minute_tokens: UsageWindow::new(MINUTE),
            day_calls: UsageWindow::new(DAY),
        })
    }

    /// Drop expired entries from every window
    pub fn prune(&mut self, now: Instant) {
        self.minute_calls.prune(now);
        self.minute_tokens.prune(now);
        self.day_calls.prune(now);
    }

    /// Record one successful call that used `tokens`
    pub fn record(&mut self, at: Instant, tokens: u64) {
        self.minute_calls.push(at, 1);
        if tokens > 0 {
            self.minute_tokens.push(at, tokens);
        }
        self.day_calls.push(at, 1);
        self.prune(at);
    }

    /// Whether no usage is recorded in any window
    pub fn is_empty(&self) -> bool {
        self.minute_calls.is_empty() && self.minute_tokens.is_empty() && self.day_calls.is_empty()
    }

    /// Check whether a request expecting `expected_tokens` fits at `now`
    ///
    /// When it does not, the returned wait is the longest over all blocked
    /// dimensions, so the request is admissible once it has elapsed.
    ///
    /// # Errors
    ///
    /// [`QuotaError::RequestExceedsTokenLimit`] when `expected_tokens` alone
    /// exceeds the per-minute token ceiling.
    pub fn check(&mut self, now: Instant, expected_tokens: u64) -> Result<Admission, QuotaError> {
        if expected_tokens > self.tokens_per_minute {
            return Err(QuotaError::RequestExceedsTokenLimit {
                requested: expected_tokens,
                limit: self.tokens_per_minute,
            });
        }

        self.prune(now);

        let candidates = [
            (
                QuotaDimension::CallsPerMinute,
                self.minute_calls.wait_for_count(now, self.calls_per_minute as usize),
            ),
            (
                QuotaDimension::TokensPerMinute,
                self.minute_tokens.wait_for_total(now, self.tokens_per_minute, expected_tokens),
            ),
            (
                QuotaDimension::CallsPerDay,
                self.day_calls.wait_for_count(now, self.calls_per_day as usize),
            ),
        ];

        let admission = candidates
            .into_iter()
            .filter(|(_, wait)| !wait.is_zero())
            .max_by_key(|(_, wait)| *wait)
            .map(|(dimension, wait)| Admission::Wait { wait, dimension })
            .unwrap_or(Admission::Admit);

        Ok(admission)
    }

    /// Wait needed before a request expecting `expected_tokens` is admissible
    pub fn time_until_admissible(&mut self, now: Instant, expected_tokens: u64) -> Result<Duration, QuotaError> {
        self.check(now, expected_tokens).map(|admission| admission.wait())
    }

    /// Current usage after pruning at `now`
    pub fn usage(&mut self, now: Instant) -> UsageSnapshot {
        self.prune(now);
        UsageSnapshot {
            calls_this_minute: self.minute_calls.len(),
            tokens_this_minute: self.minute_tokens.total(),
            calls_today: self.day_calls.len(),
            calls_per_minute_limit: self.calls_per_minute,
            tokens_per_minute_limit: self.tokens_per_minute,
            calls_per_day_limit: self.calls_per_day,
        }
    }

    /// Forget all recorded usage
    pub fn reset(&mut self) {
        self.minute_calls.clear();
        self.minute_tokens.clear();
        self.day_calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ledger(calls_per_minute: u32, tokens_per_minute: u64, calls_per_day: u32) -> QuotaLedger {
        let config = QuotaConfig::default()
            .with_calls_per_minute(calls_per_minute)
            .with_tokens_per_minute(tokens_per_minute)
            .with_calls_per_day(calls_per_day);
        QuotaLedger::new(&config).unwrap()
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        for config in [
            QuotaConfig::default().with_calls_per_minute(0),
            QuotaConfig::default().with_tokens_per_minute(0),
            QuotaConfig::default().with_calls_per_day(0),
        ] {
            assert!(matches!(QuotaLedger::new(&config), Err(QuotaError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_window_prunes_at_exact_span() {
        let start = Instant::now();
        let mut window = UsageWindow::new(MINUTE);
        window.push(start, 5);
        window.push(start + Duration::from_secs(30), 7);

        window.prune(start + Duration::from_secs(59));
        assert_eq!(window.len(), 2);

        window.prune(start + MINUTE);
        assert_eq!(window.len(), 1);
        assert_eq!(window.total(), 7);
    }

    #[test]
    fn test_window_keeps_chronological_order() {
        let start = Instant::now();
        let mut window = UsageWindow::new(MINUTE);
        window.push(start + Duration::from_secs(10), 1);
        window.push(start, 1);

        let stamps: Vec<_> = window.entries().map(|(at, _)| at).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_ledger_admits() {
        let mut ledger = ledger(15, 1_000, 1500);
        let now = Instant::now();
        assert_eq!(ledger.check(now, 500).unwrap(), Admission::Admit);
    }

    #[test]
    fn test_calls_per_minute_wait() {
        let mut ledger = ledger(2, 1_000_000, 1500);
        let start = Instant::now();
        ledger.record(start, 10);
        ledger.record(start + Duration::from_secs(20), 10);

        let now = start + Duration::from_secs(30);
        match ledger.check(now, 10).unwrap() {
            Admission::Wait { wait, dimension } => {
                assert_eq!(dimension, QuotaDimension::CallsPerMinute);
                assert_eq!(wait, Duration::from_secs(30));
            }
            Admission::Admit => panic!("Expected a wait"),
        }
    }

    #[test]
    fn test_tokens_per_minute_wait_accumulates() {
        let mut ledger = ledger(100, 1_000, 1500);
        let start = Instant::now();
        ledger.record(start, 400);
        ledger.record(start + Duration::from_secs(10), 400);
        ledger.record(start + Duration::from_secs(20), 100);

        // 900 used, 700 requested: both of the first two entries must expire
        let now = start + Duration::from_secs(25);
        match ledger.check(now, 700).unwrap() {
            Admission::Wait { wait, dimension } => {
                assert_eq!(dimension, QuotaDimension::TokensPerMinute);
                assert_eq!(wait, Duration::from_secs(45));
            }
            Admission::Admit => panic!("Expected a wait"),
        }
    }

    #[test]
    fn test_daily_limit_dominates() {
        let mut ledger = ledger(100, 1_000_000, 2);
        let start = Instant::now();
        ledger.record(start, 1);
        ledger.record(start + Duration::from_secs(1), 1);

        let now = start + Duration::from_secs(120);
        match ledger.check(now, 1).unwrap() {
            Admission::Wait { wait, dimension } => {
                assert_eq!(dimension, QuotaDimension::CallsPerDay);
                assert_eq!(wait, DAY - Duration::from_secs(120));
            }
            Admission::Admit => panic!("Expected a wait"),
        }
    }

    #[test]
    fn test_oversized_request_rejected() {
        let mut ledger = ledger(15, 1_000, 1500);
        let result = ledger.check(Instant::now(), 1_001);
        assert_eq!(
            result,
            Err(QuotaError::RequestExceedsTokenLimit {
                requested: 1_001,
                limit: 1_000
            })
        );
    }

    #[test]
    fn test_usage_snapshot() {
        let mut ledger = ledger(10, 1_000, 100);
        let start = Instant::now();
        ledger.record(start, 500);
        ledger.record(start, 300);

        let usage = ledger.usage(start + Duration::from_secs(1));
        assert_eq!(usage.calls_this_minute, 2);
        assert_eq!(usage.tokens_this_minute, 800);
        assert_eq!(usage.calls_today, 2);
        assert!((usage.peak_utilization() - 80.0).abs() < 1e-9);
        assert!(usage.to_string().starts_with("RPM 2/10"));

        let later = ledger.usage(start + Duration::from_secs(61));
        assert_eq!(later.calls_this_minute, 0);
        assert_eq!(later.tokens_this_minute, 0);
        assert_eq!(later.calls_today, 2);
    }

    #[test]
    fn test_reset_clears_usage() {
        let mut ledger = ledger(1, 1_000, 100);
        let now = Instant::now();
        ledger.record(now, 10);
        assert!(!ledger.is_empty());
        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.check(now, 10).unwrap(), Admission::Admit);
    }

    proptest! {
        #[test]
        fn prop_pruned_entries_are_younger_than_span(
            offsets in prop::collection::vec(0u64..180_000, 0..40),
            probe in 0u64..240_000,
        ) {
            let start = Instant::now();
            let mut sorted = offsets.clone();
            sorted.sort_unstable();

            let mut window = UsageWindow::new(MINUTE);
            for offset in &sorted {
                window.push(start + Duration::from_millis(*offset), 1);
            }

            let now = start + Duration::from_millis(probe.max(sorted.last().copied().unwrap_or(0)));
            window.prune(now);
            for (at, _) in window.entries() {
                prop_assert!(now.duration_since(at) < MINUTE);
            }
        }

        #[test]
        fn prop_waiting_the_computed_time_admits(
            calls_per_minute in 1u32..10,
            tokens_per_minute in 100u64..2_000,
            calls_per_day in 1u32..50,
            records in prop::collection::vec((0u64..120_000, 0u64..100), 0..30),
            expected in 0u64..100,
        ) {
            let mut ledger = ledger(calls_per_minute, tokens_per_minute, calls_per_day);
            let start = Instant::now();
            let mut sorted = records.clone();
            sorted.sort_unstable_by_key(|(offset, _)| *offset);
            for (offset, tokens) in &sorted {
                ledger.record(start + Duration::from_millis(*offset), *tokens);
            }

            let now = start + Duration::from_millis(120_000);
            let wait = ledger.time_until_admissible(now, expected).unwrap();
            prop_assert_eq!(ledger.time_until_admissible(now + wait, expected).unwrap(), Duration::ZERO);
        }
    }
}
