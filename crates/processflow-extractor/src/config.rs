//! Configuration for the extraction pipeline

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};

/// Configuration for extraction and elaboration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Maximum input text length (characters)
    pub max_text_length: usize,

    /// Full generate, parse and validate cycles before giving up
    pub max_extraction_attempts: u32,

    /// Generations per step while required sections are missing
    pub max_elaboration_attempts: u32,

    /// Output tokens budgeted per call, added to the prompt estimate
    pub expected_output_tokens: u64,

    /// Elaborate extracted processes
    pub elaborate: bool,

    /// Drop processes whose text does not appear in the source document
    pub validate_against_source: bool,

    /// Sampling temperature passed to the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            max_text_length: 100_000,
            max_extraction_attempts: 3,
            max_elaboration_attempts: 3,
            expected_output_tokens: 2_048,
            elaborate: true,
            validate_against_source: true,
            temperature: None,
        }
    }
}

impl ExtractorConfig {
    /// Strict preset: deterministic sampling, no elaboration
    pub fn strict() -> Self {
        Self {
            elaborate: false,
            temperature: Some(0.0),
            ..Self::default()
        }
    }

    /// Lenient preset: more attempts, no source validation
    pub fn lenient() -> Self {
        Self {
            max_text_length: 500_000,
            max_extraction_attempts: 5,
            max_elaboration_attempts: 5,
            expected_output_tokens: 8_192,
            elaborate: true,
            validate_against_source: false,
            temperature: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_text_length == 0 {
            return Err(ExtractorError::Config("max_text_length must be greater than 0".to_string()));
        }
        if self.max_extraction_attempts == 0 {
            return Err(ExtractorError::Config(
                "max_extraction_attempts must be greater than 0".to_string(),
            ));
        }
        if self.max_elaboration_attempts == 0 {
            return Err(ExtractorError::Config(
                "max_elaboration_attempts must be greater than 0".to_string(),
            ));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ExtractorError::Config("temperature must be within 0.0..=2.0".to_string()));
            }
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_extraction_attempts, 3);
        assert_eq!(config.max_elaboration_attempts, 3);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::strict().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
        assert!(!ExtractorConfig::strict().elaborate);
        assert!(!ExtractorConfig::lenient().validate_against_source);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = ExtractorConfig::default();
        config.max_text_length = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.max_extraction_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ExtractorConfig::default();
        config.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::strict();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
