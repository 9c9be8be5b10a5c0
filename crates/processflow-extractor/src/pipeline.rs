//! Document processing pipeline

use crate::client::GenerationClient;
use crate::config::ExtractorConfig;
use crate::elaborator::ProcessElaborator;
use crate::error::ExtractorError;
use crate::extractor::ProcessExtractor;
use crate::types::ExtractionOutcome;
use processflow_domain::{Document, GenerationOptions, LlmProvider};
use processflow_ratelimit::{CallExecutor, ExecutorMetrics, UsageSnapshot};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Turns raw document text into a document with extracted processes
///
/// Extraction and elaboration share one call executor, so every generation
/// counts against the same quota.
///
/// # Examples
///
/// ```
/// use processflow_extractor::{ExtractorConfig, ProcessFlow};
/// use processflow_llm::MockProvider;
/// use processflow_ratelimit::{CallExecutor, QuotaConfig};
///
/// # #[tokio::main]
/// # async fn main() {
/// let provider = MockProvider::new(r#"[{"name": "Open inventory"}]"#);
/// let executor = CallExecutor::new(QuotaConfig::default()).unwrap();
/// let flow = ProcessFlow::new(provider, executor, ExtractorConfig::strict()).unwrap();
///
/// let document = flow
///     .process_document("Step 1: Open inventory.", Some("Inventory"))
///     .await
///     .unwrap();
/// assert_eq!(document.processes.len(), 1);
/// # }
/// ```
pub struct ProcessFlow<L> {
    extractor: ProcessExtractor<L>,
    elaborator: ProcessElaborator<L>,
    executor: Arc<CallExecutor>,
    config: ExtractorConfig,
}

impl<L> ProcessFlow<L>
where
    L: LlmProvider,
    L::Error: fmt::Display,
{
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// [`ExtractorError::Config`] if the configuration is invalid.
    pub fn new(provider: L, executor: CallExecutor, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate()?;

        let executor = Arc::new(executor);
        let options = match config.temperature {
            Some(t) => GenerationOptions::default().with_temperature(t),
            None => GenerationOptions::default(),
        };
        let client = GenerationClient::new(Arc::new(provider), Arc::clone(&executor))
            .with_options(options)
            .with_expected_output_tokens(config.expected_output_tokens);

        Ok(Self {
            extractor: ProcessExtractor::new(client.clone(), config.clone()),
            elaborator: ProcessElaborator::new(client, config.max_elaboration_attempts),
            executor,
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Current quota usage
    pub fn usage(&self) -> UsageSnapshot {
        self.executor.usage()
    }

    /// Executor metrics collected so far
    pub fn metrics(&self) -> ExecutorMetrics {
        self.executor.metrics()
    }

    /// Extract (and optionally elaborate) the processes in `content`
    ///
    /// A document with no extractable processes is returned with an empty
    /// process list.
    ///
    /// # Errors
    ///
    /// [`ExtractorError::TextTooLong`] if `content` exceeds `max_text_length`.
    pub async fn process_document(&self, content: &str, title: Option<&str>) -> Result<Document, ExtractorError> {
        self.process_document_detailed(content, title)
            .await
            .map(|(document, _)| document)
    }

    /// Like [`process_document`](Self::process_document), also returning the
    /// extraction outcome (rejections and attempt count)
    pub async fn process_document_detailed(
        &self,
        content: &str,
        title: Option<&str>,
    ) -> Result<(Document, ExtractionOutcome), ExtractorError> {
        let length = content.chars().count();
        if length > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(length, self.config.max_text_length));
        }

        let mut document = Document::new(title.map(str::to_string), content);
        let mut outcome = self.extractor.extract(&document).await;

        if self.config.elaborate {
            for process in outcome.processes.iter_mut() {
                self.elaborator.elaborate_process(process).await;
            }
        }

        document.set_processes(outcome.processes.clone());
        info!(
            "Processed document '{}': {} processes, {} rejected. {}",
            document.title,
            document.processes.len(),
            outcome.rejected.len(),
            self.executor.usage()
        );

        Ok((document, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use processflow_domain::UNTITLED;
    use processflow_llm::MockProvider;
    use processflow_ratelimit::QuotaConfig;

    fn flow(provider: MockProvider, config: ExtractorConfig) -> ProcessFlow<MockProvider> {
        let executor = CallExecutor::new(QuotaConfig::default().with_max_retries(0)).unwrap();
        ProcessFlow::new(provider, executor, config).unwrap()
    }

    #[tokio::test]
    async fn test_text_too_long() {
        let mut config = ExtractorConfig::strict();
        config.max_text_length = 10;
        let provider = MockProvider::new("[]");
        let flow = flow(provider.clone(), config);

        let result = flow.process_document("this is far too long", None).await;
        assert!(matches!(result, Err(ExtractorError::TextTooLong(20, 10))));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_total_failure_yields_empty_document() {
        let flow = flow(MockProvider::new("not json at all"), ExtractorConfig::strict());

        let document = flow.process_document("Step 1: Open inventory.", None).await.unwrap();
        assert_eq!(document.title, UNTITLED);
        assert!(document.processes.is_empty());
        assert!(document.created_at.is_some());
        assert!(document.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_elaboration_runs_when_enabled() {
        let provider = MockProvider::new("1. SCOPE\n2. PROCEDURE\n3. CONTROL CRITERIA");
        provider.push_response(r#"[{"name": "Open inventory", "sub_processes": [{"name": "Open inventory"}]}]"#);
        let flow = flow(provider.clone(), ExtractorConfig::default());

        let (document, outcome) = flow
            .process_document_detailed("Step 1: Open inventory.", Some("Intake"))
            .await
            .unwrap();

        assert_eq!(document.title, "Intake");
        assert_eq!(outcome.attempts, 1);
        // extraction, description, step, duration
        assert_eq!(provider.call_count(), 4);
        assert!(document.processes[0].sub_processes[0]
            .description
            .contains("2. PROCEDURE"));
        assert_eq!(flow.usage().calls_this_minute, 4);
        assert_eq!(flow.metrics().successes, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ExtractorConfig::default();
        config.max_extraction_attempts = 0;
        let executor = CallExecutor::new(QuotaConfig::default()).unwrap();
        let result = ProcessFlow::new(MockProvider::default(), executor, config);
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }
}
