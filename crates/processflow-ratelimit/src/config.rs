//! Quota configuration
//!
//! Numeric ceilings for every quota dimension plus the retry budget and the
//! backoff constants.

use crate::error::QuotaError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ceilings and retry settings for the call executor
///
/// # Examples
///
/// ```
/// use processflow_ratelimit::QuotaConfig;
///
/// let config = QuotaConfig::default();
/// assert_eq!(config.calls_per_minute, 15);
/// assert!(config.validate().is_ok());
///
/// let config = QuotaConfig::paid_tier();
/// assert!(config.calls_per_minute > QuotaConfig::default().calls_per_minute);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum calls in any rolling minute
    pub calls_per_minute: u32,

    /// Maximum tokens in any rolling minute
    pub tokens_per_minute: u64,

    /// Maximum calls in any rolling day
    pub calls_per_day: u32,

    /// Retries after the first attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,

    /// Base of the exponential backoff after quota failures
    pub backoff_base: f64,

    /// Upper bound on a single quota backoff (seconds)
    pub backoff_cap_secs: u64,

    /// Upper bound on the random jitter added to a quota backoff (seconds)
    pub jitter_cap_secs: u64,

    /// Fixed wait after a non-quota failure (milliseconds)
    pub transient_retry_delay_ms: u64,
}

impl Default for QuotaConfig {
    /// Limits of the free generation tier
    ///
    /// - 15 calls per minute
    /// - 1,000,000 tokens per minute
    /// - 1,500 calls per day
    /// - 3 retries
    fn default() -> Self {
        Self {
            calls_per_minute: 15,
            tokens_per_minute: 1_000_000,
            calls_per_day: 1500,
            max_retries: 3,
            backoff_base: 2.0,
            backoff_cap_secs: 300,
            jitter_cap_secs: 10,
            transient_retry_delay_ms: 1000,
        }
    }
}

impl QuotaConfig {
    /// Free tier limits (same as [`Default`])
    pub fn free_tier() -> Self {
        Self::default()
    }

    /// Pay-as-you-go limits
    ///
    /// - 1,000 calls per minute
    /// - 4,000,000 tokens per minute
    /// - 100,000 calls per day
    /// - 5 retries
    pub fn paid_tier() -> Self {
        Self {
            calls_per_minute: 1000,
            tokens_per_minute: 4_000_000,
            calls_per_day: 100_000,
            max_retries: 5,
            ..Self::default()
        }
    }

    /// Override the per-minute call ceiling
    pub fn with_calls_per_minute(mut self, calls_per_minute: u32) -> Self {
        self.calls_per_minute = calls_per_minute;
        self
    }

    /// Override the per-minute token ceiling
    pub fn with_tokens_per_minute(mut self, tokens_per_minute: u64) -> Self {
        self.tokens_per_minute = tokens_per_minute;
        self
    }

    /// Override the per-day call ceiling
    pub fn with_calls_per_day(mut self, calls_per_day: u32) -> Self {
        self.calls_per_day = calls_per_day;
        self
    }

    /// Override the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), QuotaError> {
        if self.calls_per_minute == 0 {
            return Err(QuotaError::InvalidConfig("calls_per_minute must be greater than 0".to_string()));
        }
        if self.tokens_per_minute == 0 {
            return Err(QuotaError::InvalidConfig("tokens_per_minute must be greater than 0".to_string()));
        }
        if self.calls_per_day == 0 {
            return Err(QuotaError::InvalidConfig("calls_per_day must be greater than 0".to_string()));
        }
        if !self.backoff_base.is_finite() || self.backoff_base < 1.0 {
            return Err(QuotaError::InvalidConfig("backoff_base must be a finite number >= 1.0".to_string()));
        }
        if self.backoff_cap_secs == 0 {
            return Err(QuotaError::InvalidConfig("backoff_cap_secs must be greater than 0".to_string()));
        }
        Ok(())
    }

    /// Quota backoff cap as a Duration
    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }

    /// Jitter cap as a Duration
    pub fn jitter_cap(&self) -> Duration {
        Duration::from_secs(self.jitter_cap_secs)
    }

    /// Wait after a non-quota failure as a Duration
    pub fn transient_retry_delay(&self) -> Duration {
        Duration::from_millis(self.transient_retry_delay_ms)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, QuotaError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| QuotaError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, QuotaError> {
        toml::to_string_pretty(self)
            .map_err(|e| QuotaError::InvalidConfig(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QuotaConfig::default();
        assert_eq!(config.calls_per_minute, 15);
        assert_eq!(config.tokens_per_minute, 1_000_000);
        assert_eq!(config.calls_per_day, 1500);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff_cap(), Duration::from_secs(300));
        assert_eq!(config.jitter_cap(), Duration::from_secs(10));
        assert_eq!(config.transient_retry_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(QuotaConfig::free_tier().validate().is_ok());
        assert!(QuotaConfig::paid_tier().validate().is_ok());
        assert_eq!(QuotaConfig::free_tier(), QuotaConfig::default());
    }

    #[test]
    fn test_zero_ceilings_rejected() {
        assert!(QuotaConfig::default().with_calls_per_minute(0).validate().is_err());
        assert!(QuotaConfig::default().with_tokens_per_minute(0).validate().is_err());
        assert!(QuotaConfig::default().with_calls_per_day(0).validate().is_err());
    }

    #[test]
    fn test_invalid_backoff_base() {
        let mut config = QuotaConfig::default();
        config.backoff_base = 0.5;
        assert!(config.validate().is_err());
        config.backoff_base = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_is_valid() {
        let config = QuotaConfig::default().with_max_retries(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = QuotaConfig::paid_tier();
        let toml_str = config.to_toml().unwrap();
        let parsed = QuotaConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_toml_backoff_fields_optional() {
        let parsed = QuotaConfig::from_toml(
            "calls_per_minute = 60\ntokens_per_minute = 5000\ncalls_per_day = 100\nmax_retries = 2\n",
        )
        .unwrap();
        assert_eq!(parsed.calls_per_minute, 60);
        assert_eq!(parsed.backoff_base, 2.0);
        assert_eq!(parsed.backoff_cap_secs, 300);
    }

    #[test]
    fn test_toml_partial_override() {
        let parsed = QuotaConfig::from_toml("calls_per_minute = 60\n").unwrap();
        assert_eq!(parsed.calls_per_minute, 60);
        assert_eq!(parsed.tokens_per_minute, 1_000_000);
        assert_eq!(parsed.calls_per_day, 1500);
        assert_eq!(parsed.max_retries, 3);
        assert_eq!(QuotaConfig::from_toml("").unwrap(), QuotaConfig::default());
    }

    #[test]
    fn test_toml_invalid_values_rejected() {
        let result = QuotaConfig::from_toml(
            "calls_per_minute = 0\ntokens_per_minute = 5000\ncalls_per_day = 100\nmax_retries = 2\n",
        );
        assert!(matches!(result, Err(QuotaError::InvalidConfig(_))));
    }
}
