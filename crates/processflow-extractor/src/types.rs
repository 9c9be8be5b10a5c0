//! Result types for extraction

use processflow_domain::Process;
use serde::{Deserialize, Serialize};

/// A process record dropped because its text was not found in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedProcess {
    /// Id of the dropped process
    pub process_id: String,

    /// Name of the dropped process
    pub process_name: String,

    /// Field whose value was not found (e.g. `sub_processes[1].name`)
    pub field: String,

    /// The value that was not found
    pub value: String,
}

/// Result of an extraction run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    /// Validated processes from the winning attempt (empty on total failure)
    pub processes: Vec<Process>,

    /// Processes dropped by source validation, across all attempts
    pub rejected: Vec<RejectedProcess>,

    /// Attempts made
    pub attempts: u32,
}

impl ExtractionOutcome {
    /// Whether no process survived
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
