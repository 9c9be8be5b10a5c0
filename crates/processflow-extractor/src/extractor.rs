//! Process extraction from documents

use crate::client::GenerationClient;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{clean_json_string, parse_processes, ParsedProcess};
use crate::prompt::PromptBuilder;
use crate::types::{ExtractionOutcome, RejectedProcess};
use crate::validation::SourceValidator;
use processflow_domain::{Document, LlmProvider, Process};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Extracts process records from document text
pub struct ProcessExtractor<L> {
    client: GenerationClient<L>,
    config: ExtractorConfig,
}

impl<L> ProcessExtractor<L>
where
    L: LlmProvider,
    L::Error: fmt::Display,
{
    /// Create a new extractor
    pub fn new(client: GenerationClient<L>, config: ExtractorConfig) -> Self {
        Self { client, config }
    }

    /// Extract validated processes from a document
    ///
    /// Returns an empty list when no attempt produced a valid process.
    pub async fn analyze_document(&self, document: &Document) -> Vec<Process> {
        self.extract(document).await.processes
    }

    /// Extract validated processes, keeping track of rejections
    ///
    /// Runs up to `max_extraction_attempts` generate, parse and validate
    /// cycles. The first cycle that yields at least one valid process wins.
    pub async fn extract(&self, document: &Document) -> ExtractionOutcome {
        let prompt = PromptBuilder::new(&document.content).build();
        let max_attempts = self.config.max_extraction_attempts;
        let mut rejected = Vec::new();

        info!(
            "Starting extraction for document '{}' ({} chars)",
            document.title,
            document.content.len()
        );

        for attempt in 1..=max_attempts {
            match self.attempt(&prompt, document).await {
                Ok((processes, mut dropped)) => {
                    rejected.append(&mut dropped);
                    if !processes.is_empty() {
                        info!(
                            "Extracted {} processes on attempt {} ({} rejected)",
                            processes.len(),
                            attempt,
                            rejected.len()
                        );
                        return ExtractionOutcome {
                            processes,
                            rejected,
                            attempts: attempt,
                        };
                    }
                    warn!("Attempt {}: no valid processes in response", attempt);
                }
                Err(e) => {
                    error!("Attempt {}: Error processing response - {}", attempt, e);
                }
            }
        }

        error!("Failed to extract valid processes after {} attempts", max_attempts);
        ExtractionOutcome {
            processes: Vec::new(),
            rejected,
            attempts: max_attempts,
        }
    }

    /// One generate, clean, parse and validate cycle
    async fn attempt(
        &self,
        prompt: &str,
        document: &Document,
    ) -> Result<(Vec<Process>, Vec<RejectedProcess>), ExtractorError> {
        let response = self.client.generate(prompt).await?;
        debug!("Response length: {} chars", response.len());

        let parsed = parse_processes(&clean_json_string(&response))?;
        debug!("Parsed {} process candidates", parsed.len());

        Ok(self.select(document, parsed))
    }

    /// Split candidates into accepted processes and rejections
    fn select(&self, document: &Document, parsed: Vec<ParsedProcess>) -> (Vec<Process>, Vec<RejectedProcess>) {
        if !self.config.validate_against_source {
            return (parsed.into_iter().map(ParsedProcess::into_process).collect(), Vec::new());
        }

        let validator = SourceValidator::new(&document.content);
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for candidate in parsed {
            match validator.review(&candidate) {
                Ok(()) => accepted.push(candidate.into_process()),
                Err(rejection) => {
                    warn!(
                        "Removing invalid process '{}': content not found in {}: {}",
                        rejection.process_name, rejection.field, rejection.value
                    );
                    rejected.push(rejection);
                }
            }
        }

        (accepted, rejected)
    }
}
