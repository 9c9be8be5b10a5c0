//! Rate-limited generation client
//!
//! Pairs a provider with the shared call executor so every generation in the
//! pipeline is admitted, charged and retried in one place.

use crate::error::ExtractorError;
use crate::prompt::estimate_tokens;
use processflow_domain::{GenerationOptions, LlmProvider};
use processflow_ratelimit::CallExecutor;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Default output token budget per call
pub const DEFAULT_OUTPUT_TOKENS: u64 = 2_048;

/// Provider plus executor
pub struct GenerationClient<L> {
    provider: Arc<L>,
    executor: Arc<CallExecutor>,
    options: GenerationOptions,
    expected_output_tokens: u64,
}

impl<L> Clone for GenerationClient<L> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            executor: Arc::clone(&self.executor),
            options: self.options.clone(),
            expected_output_tokens: self.expected_output_tokens,
        }
    }
}

impl<L> GenerationClient<L>
where
    L: LlmProvider,
    L::Error: fmt::Display,
{
    /// Create a client sharing `executor`
    pub fn new(provider: Arc<L>, executor: Arc<CallExecutor>) -> Self {
        Self {
            provider,
            executor,
            options: GenerationOptions::default(),
            expected_output_tokens: DEFAULT_OUTPUT_TOKENS,
        }
    }

    /// Set the options passed on every call
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the output token budget added to each prompt estimate
    pub fn with_expected_output_tokens(mut self, tokens: u64) -> Self {
        self.expected_output_tokens = tokens;
        self
    }

    /// The shared executor
    pub fn executor(&self) -> &CallExecutor {
        &self.executor
    }

    /// Model name of the provider
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Generate text for `prompt` through the executor
    ///
    /// # Errors
    ///
    /// [`ExtractorError::Generation`] when the executor gives up.
    pub async fn generate(&self, prompt: &str) -> Result<String, ExtractorError> {
        let tokens = estimate_tokens(prompt, self.expected_output_tokens);
        let provider = self.provider.as_ref();
        let options = &self.options;

        debug!(
            "Generating with {} ({} chars, ~{} tokens)",
            provider.model_name(),
            prompt.len(),
            tokens
        );

        let text = self
            .executor
            .execute(|| provider.generate(prompt, options), tokens)
            .await?;
        Ok(text)
    }
}
