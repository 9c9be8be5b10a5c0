//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use serde::{Deserialize, Serialize};
use std::future::Future;

/// Per-call generation settings passed through to the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token limit
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (processflow-llm). Callers never
/// invoke a provider directly; every call is routed through the rate-limited
/// executor in processflow-ratelimit.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a text completion for `prompt`
    fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Short model name, used in logs
    fn model_name(&self) -> &str;
}
