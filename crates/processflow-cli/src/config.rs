//! Configuration management for the CLI.
//!
//! ```toml
//! [provider]
//! model = "gemini-1.5-flash"
//! timeout_secs = 60
//!
//! [quota]
//! calls_per_minute = 15
//! tokens_per_minute = 1000000
//! calls_per_day = 1500
//! max_retries = 3
//!
//! [extractor]
//! max_text_length = 100000
//! max_extraction_attempts = 3
//! max_elaboration_attempts = 3
//! expected_output_tokens = 2048
//! elaborate = true
//! validate_against_source = true
//! ```
//!
//! Every section and every key is optional; anything left out takes its default.

use crate::error::{CliError, Result};
use processflow_extractor::ExtractorConfig;
use processflow_llm::gemini::{DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use processflow_ratelimit::QuotaConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generation service settings
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Quota and retry settings
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Extraction settings
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Generation service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Alternative API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderSettings {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".processflow").join("config.toml"))
    }

    /// Load from `path`, or from the default path when none is given.
    ///
    /// A missing file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            Self::from_toml(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        if self.provider.model.trim().is_empty() {
            return Err(CliError::Config("provider.model must not be empty".to_string()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(CliError::Config("provider.timeout_secs must be greater than 0".to_string()));
        }
        self.quota.validate()?;
        self.extractor.validate()?;
        Ok(())
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.model, DEFAULT_MODEL);
        assert_eq!(config.quota, QuotaConfig::free_tier());
        assert!(config.extractor.elaborate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.quota.calls_per_minute, 15);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[provider]\nmodel = \"gemini-1.5-pro\"\nendpoint = \"http://localhost:9000\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.provider.model, "gemini-1.5-pro");
        assert_eq!(config.provider.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.provider.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml("[quota]\ncalls_per_minute = 5\n\n[extractor]\nelaborate = false\n").unwrap();
        assert_eq!(config.quota.calls_per_minute, 5);
        assert_eq!(config.quota.calls_per_day, QuotaConfig::default().calls_per_day);
        assert!(!config.extractor.elaborate);
        assert_eq!(config.extractor.max_text_length, ExtractorConfig::default().max_text_length);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.quota = QuotaConfig::paid_tier();
        config.extractor = ExtractorConfig::strict();
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.quota, QuotaConfig::paid_tier());
        assert_eq!(loaded.extractor, ExtractorConfig::strict());
    }

    #[test]
    fn test_invalid_quota_rejected() {
        let toml = "[quota]\ncalls_per_minute = 0\n";
        let result = Config::from_toml(toml);
        assert!(matches!(result, Err(CliError::Quota(_))));
    }

    #[test]
    fn test_invalid_extractor_rejected() {
        let mut config = Config::default();
        config.extractor.max_extraction_attempts = 0;
        assert!(matches!(config.validate(), Err(CliError::Extractor(_))));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(Config::from_toml("[quota"), Err(CliError::Toml(_))));
    }
}
