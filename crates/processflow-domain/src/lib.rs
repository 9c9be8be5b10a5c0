//! ProcessFlow Domain Layer
//!
//! This crate contains the domain model shared by every other ProcessFlow crate.
//! It defines the records produced by extraction and the trait boundary to the
//! text generation service.
//!
//! ## Key Concepts
//!
//! - **Document**: the input text plus the processes found in it
//! - **Process**: a named procedure owning ordered phases and steps
//! - **Phase**: an ordered stage; steps point at it by id
//! - **SubProcess**: a single step, elaborated into detailed instructions
//!
//! ## Architecture
//!
//! - Plain data with serde derives (stable snake_case field names)
//! - Trait definitions for all external interactions
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod process;
pub mod traits;

// Re-exports for convenience
pub use document::{unix_now, Document, UNTITLED};
pub use process::{
    Phase, Process, ProcessMetrics, ProcessStatus, Resource, RiskLevel, SubProcess,
    ValidationCriteria, DEFAULT_DESCRIPTION,
};
pub use traits::{GenerationOptions, LlmProvider};
