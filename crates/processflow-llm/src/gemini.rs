//! Gemini Provider Implementation
//!
//! Provides integration with Google's Generative Language API
//! (`models/{model}:generateContent`).
//!
//! # Features
//!
//! - Async HTTP communication via `reqwest`
//! - Configurable endpoint, model and request timeout
//! - Non-success statuses surface as [`LlmError::Http`] so the call executor
//!   can recognise quota exhaustion (HTTP 429)
//!
//! # Examples
//!
//! ```no_run
//! use processflow_llm::GeminiProvider;
//!
//! let provider = GeminiProvider::new("my-api-key", "gemini-1.5-flash").unwrap();
//! ```

use crate::LlmError;
use processflow_domain::{GenerationOptions, LlmProvider};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Generative Language API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for a single generation request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Gemini API provider
///
/// Sends one `generateContent` request per call. It never retries on its own.
pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the generateContent API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Response from the generateContent API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateContentRequest {
    fn new(prompt: &str, options: &GenerationOptions) -> Self {
        let generation_config = if options.temperature.is_some() || options.max_output_tokens.is_some() {
            Some(GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config,
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Result<String, LlmError> {
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            LlmError::InvalidResponse(reason)
        })?;

        let content = candidate
            .content
            .ok_or_else(|| LlmError::InvalidResponse("candidate has no content".to_string()))?;

        Ok(content.parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Parameters
    ///
    /// - `api_key`: Generative Language API key
    /// - `model`: Model to use (e.g., "gemini-1.5-flash")
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Communication`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(api_key, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new Gemini provider with a custom request timeout
    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Override the API endpoint (useful for proxies and tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Generate text using the Gemini API
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The service cannot be reached
    /// - The model does not exist (HTTP 404)
    /// - The service answers with any other non-success status
    /// - Response format is invalid
    pub async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, LlmError> {
        let request_body = GenerateContentRequest::new(prompt, options);

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed.into_text()
    }
}

impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Self::Error> {
        GeminiProvider::generate(self, prompt, options).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_provider_creation() {
        let provider = GeminiProvider::new("key", "gemini-1.5-flash").unwrap();
        assert_eq!(provider.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(provider.model, "gemini-1.5-flash");
        assert_eq!(
            provider.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_with_endpoint_trims_slash() {
        let provider = GeminiProvider::new("key", "m")
            .unwrap()
            .with_endpoint("http://localhost:8081/");
        assert_eq!(provider.url(), "http://localhost:8081/v1beta/models/m:generateContent");
    }

    #[test]
    fn test_request_shape() {
        let options = GenerationOptions::default().with_temperature(0.2);
        let body = serde_json::to_value(GenerateContentRequest::new("hi", &options)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());

        let bare = serde_json::to_value(GenerateContentRequest::new("hi", &GenerationOptions::default())).unwrap();
        assert!(bare.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_text_is_joined() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "[{\"a\""}, {"text": ": 1}]"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.into_text().unwrap(), r#"[{"a": 1}]"#);
    }

    #[test]
    fn test_blocked_prompt_is_invalid_response() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        match response.into_text() {
            Err(LlmError::InvalidResponse(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gemini_error_handling() {
        // Nothing listens on port 1
        let provider = GeminiProvider::new("key", "m")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1");

        let result = provider.generate("test", &GenerationOptions::default()).await;
        match result {
            Err(LlmError::Communication(_)) => {} // Expected
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }

    // Integration test (requires GEMINI_API_KEY)
    #[tokio::test]
    #[ignore]
    async fn test_gemini_generate_integration() {
        let Ok(key) = std::env::var("GEMINI_API_KEY") else {
            return;
        };
        let provider = GeminiProvider::new(key, DEFAULT_MODEL).unwrap();
        let result = provider
            .generate("Say 'hello' and nothing else", &GenerationOptions::default())
            .await;
        if let Ok(response) = result {
            assert!(!response.is_empty());
        }
    }
}
