//! ProcessFlow Extractor
//!
//! Converts unstructured document text into structured process records using
//! a text generation service.
//!
//! # Architecture
//!
//! ```text
//! Document → Prompt → CallExecutor → LlmProvider
//!                                        ↓
//!        Process ← Validation ← Parser ← Cleanup
//!           ↓
//!      Elaboration (optional) → Document.processes → ProcessExport
//! ```
//!
//! # Key Features
//!
//! - **Lenient parsing**: fenced or unbracketed JSON is accepted, missing
//!   ids, names, descriptions and orders are filled in
//! - **Phase inference**: `_phase<n>` markers in step ids become phases
//! - **Source validation**: processes whose text cannot be found in the
//!   document are dropped
//! - **Bounded retries**: a fixed number of extraction cycles, each call
//!   admitted and retried by the shared call executor
//! - **Elaboration**: sectioned step instructions and duration estimates
//!
//! # Example Usage
//!
//! ```no_run
//! use processflow_extractor::{ExtractorConfig, ProcessExport, ProcessFlow};
//! use processflow_llm::GeminiProvider;
//! use processflow_ratelimit::{CallExecutor, QuotaConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = GeminiProvider::new("api-key", "gemini-1.5-flash")?;
//! let executor = CallExecutor::new(QuotaConfig::free_tier())?;
//! let flow = ProcessFlow::new(provider, executor, ExtractorConfig::default())?;
//!
//! let document = flow
//!     .process_document("Step 1: Open inventory. Step 2: Click new.", Some("Inventory"))
//!     .await?;
//!
//! for process in &document.processes {
//!     println!("{}", ProcessExport::from(process).render_markdown());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod client;
mod config;
mod elaborator;
mod error;
mod export;
mod extractor;
mod parser;
mod pipeline;
mod prompt;
mod types;
mod validation;

pub use client::{GenerationClient, DEFAULT_OUTPUT_TOKENS};
pub use config::ExtractorConfig;
pub use elaborator::ProcessElaborator;
pub use error::ExtractorError;
pub use export::{ExportStep, ProcessExport};
pub use extractor::ProcessExtractor;
pub use parser::{clean_json_string, parse_processes, phase_marker, Field, FieldRef, ParsedProcess};
pub use pipeline::ProcessFlow;
pub use prompt::{estimate_tokens, missing_sections, PromptBuilder, DURATION_NOT_SPECIFIED, REQUIRED_SECTIONS};
pub use types::{ExtractionOutcome, RejectedProcess};
pub use validation::{SourceValidator, UnsupportedField};
