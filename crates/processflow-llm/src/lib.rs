//! ProcessFlow LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `processflow-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing
//! - `GeminiProvider`: Google Generative Language API integration
//!
//! Providers make exactly one request per `generate` call. Retrying and
//! throttling belong to the call executor in `processflow-ratelimit`, which
//! classifies failures by their display message; HTTP failures therefore
//! always carry their status code in the message.
//!
//! # Examples
//!
//! ```
//! use processflow_llm::MockProvider;
//! use processflow_domain::{GenerationOptions, LlmProvider};
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let result = rt
//!     .block_on(provider.generate("test prompt", &GenerationOptions::default()))
//!     .unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod gemini;

use processflow_domain::{GenerationOptions, LlmProvider};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

pub use gemini::GeminiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Non-success HTTP status from the service
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body, as returned
        body: String,
    },

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded (HTTP 429)")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// HTTP status associated with this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            LlmError::Http { status, .. } => Some(*status),
            LlmError::RateLimitExceeded => Some(429),
            LlmError::ModelNotAvailable(_) => Some(404),
            _ => None,
        }
    }
}

/// Mock LLM provider for deterministic testing
///
/// Responses are chosen in this order:
/// 1. the next scripted outcome pushed with [`push_response`](Self::push_response)
///    or [`push_error`](Self::push_error);
/// 2. a response registered for the exact prompt;
/// 3. the default response.
///
/// # Examples
///
/// ```
/// use processflow_llm::{LlmError, MockProvider};
///
/// let provider = MockProvider::new("fallback");
/// provider.push_error(LlmError::RateLimitExceeded);
/// provider.push_response("first real answer");
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<HashMap<String, String>>>,
    script: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(HashMap::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).insert(prompt.into(), response.into());
    }

    /// Queue a response for the next unscripted call
    pub fn push_response(&self, response: impl Into<String>) {
        lock(&self.script).push_back(Ok(response.into()));
    }

    /// Queue an error for the next unscripted call
    pub fn push_error(&self, error: LlmError) {
        lock(&self.script).push_back(Err(error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }

    fn respond(&self, prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push(prompt.to_string());

        if let Some(outcome) = lock(&self.script).pop_front() {
            return outcome;
        }

        if let Some(response) = lock(&self.responses).get(prompt) {
            return Ok(response.clone());
        }

        Ok(self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send {
        std::future::ready(self.respond(prompt))
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn gen(provider: &MockProvider, prompt: &str) -> Result<String, LlmError> {
        provider.generate(prompt, &GenerationOptions::default()).await
    }

    #[tokio::test]
    async fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = gen(&provider, "any prompt").await;
        assert_eq!(result.unwrap(), "Test response");
    }

    #[tokio::test]
    async fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(gen(&provider, "hello").await.unwrap(), "world");
        assert_eq!(gen(&provider, "foo").await.unwrap(), "bar");
        assert_eq!(gen(&provider, "unknown").await.unwrap(), "Default mock response");
    }

    #[tokio::test]
    async fn test_mock_provider_script_takes_precedence() {
        let mut provider = MockProvider::new("fallback");
        provider.add_response("hello", "world");
        provider.push_error(LlmError::RateLimitExceeded);
        provider.push_response("scripted");

        assert!(matches!(gen(&provider, "hello").await, Err(LlmError::RateLimitExceeded)));
        assert_eq!(gen(&provider, "hello").await.unwrap(), "scripted");
        assert_eq!(gen(&provider, "hello").await.unwrap(), "world");
        assert_eq!(gen(&provider, "other").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        gen(&provider, "prompt1").await.unwrap();
        gen(&provider, "prompt2").await.unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        gen(&provider1, "test").await.unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_error_messages_carry_status() {
        let err = LlmError::Http { status: 429, body: "Resource has been exhausted".to_string() };
        assert_eq!(err.to_string(), "HTTP 429: Resource has been exhausted");
        assert_eq!(err.status_code(), Some(429));
        assert!(LlmError::RateLimitExceeded.to_string().contains("429"));
        assert_eq!(LlmError::Other("x".into()).status_code(), None);
    }
}
