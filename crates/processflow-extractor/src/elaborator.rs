//! Process elaboration
//!
//! Expands extracted processes: a refined process description, sectioned
//! step-by-step instructions per sub-process and a duration estimate where
//! none was given. Generation failures never abort elaboration; the affected
//! field keeps its previous value.

use crate::client::GenerationClient;
use crate::prompt::{
    description_prompt, duration_prompt, missing_sections, process_context, step_prompt,
    DURATION_NOT_SPECIFIED,
};
use processflow_domain::{LlmProvider, Process, SubProcess};
use std::fmt;
use tracing::{error, info, warn};

/// Elaborates processes through the shared generation client
pub struct ProcessElaborator<L> {
    client: GenerationClient<L>,
    max_attempts: u32,
}

impl<L> ProcessElaborator<L>
where
    L: LlmProvider,
    L::Error: fmt::Display,
{
    /// Create a new elaborator
    ///
    /// `max_attempts` bounds the generations per step while required sections
    /// are missing (at least one is always made).
    pub fn new(client: GenerationClient<L>, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Elaborate a process in place
    pub async fn elaborate_process(&self, process: &mut Process) {
        info!(
            "Elaborating process '{}' ({} steps)",
            process.name,
            process.sub_processes.len()
        );

        process.description = self.elaborate_description(process).await;
        let context = process_context(process);

        for step in process.sub_processes.iter_mut() {
            step.description = self.elaborate_step(step, &context).await;

            if step.estimated_duration.is_none() {
                step.estimated_duration = Some(self.estimate_duration(&step.description).await);
            }
        }
    }

    async fn elaborate_description(&self, process: &Process) -> String {
        match self.client.generate(&description_prompt(process)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Empty description for process '{}', keeping original", process.name);
                process.description.clone()
            }
            Err(e) => {
                error!("Error elaborating process description: {}", e);
                process.description.clone()
            }
        }
    }

    /// Sectioned instructions for one step
    ///
    /// Regenerates while sections are missing, up to the attempt bound. After
    /// the bound the last response is kept.
    async fn elaborate_step(&self, step: &SubProcess, context: &str) -> String {
        let prompt = step_prompt(step, context);
        let mut last = None;

        for attempt in 1..=self.max_attempts {
            let text = match self.client.generate(&prompt).await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    error!("Error elaborating sub-process '{}': {}", step.name, e);
                    return step.description.clone();
                }
            };

            let missing = missing_sections(&text);
            if missing.is_empty() {
                return text;
            }

            warn!(
                "Incomplete description for '{}' (attempt {} of {}). Missing sections: {:?}",
                step.name, attempt, self.max_attempts, missing
            );
            last = Some(text);
        }

        warn!(
            "Keeping incomplete description for '{}' after {} attempts",
            step.name, self.max_attempts
        );
        last.filter(|text| !text.is_empty())
            .unwrap_or_else(|| step.description.clone())
    }

    async fn estimate_duration(&self, description: &str) -> String {
        match self.client.generate(&duration_prompt(description)).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => DURATION_NOT_SPECIFIED.to_string(),
            Err(e) => {
                error!("Error estimating duration: {}", e);
                DURATION_NOT_SPECIFIED.to_string()
            }
        }
    }
}
