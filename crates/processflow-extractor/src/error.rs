//! Error types for the extraction pipeline

use processflow_ratelimit::{ExecutorError, QuotaError};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during extraction and elaboration
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Generated text is not a JSON array of objects
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Generation failed after the executor gave up
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Text exceeds maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

impl From<QuotaError> for ExtractorError {
    fn from(e: QuotaError) -> Self {
        match e {
            QuotaError::InvalidConfig(msg) => ExtractorError::Config(msg),
            other => ExtractorError::Generation(other.to_string()),
        }
    }
}

impl<E: fmt::Display> From<ExecutorError<E>> for ExtractorError {
    fn from(e: ExecutorError<E>) -> Self {
        ExtractorError::Generation(e.to_string())
    }
}
