//! Process module - the hierarchical records extracted from documents
//!
//! A [`Process`] owns its [`Phase`]s and [`SubProcess`]es. Sub-processes point
//! at their phase through `phase_id`; many sub-processes may share a phase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when the model omits a description
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// Lifecycle state of a process, phase or sub-process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Work has not begun
    #[default]
    NotStarted,
    /// Work is underway
    InProgress,
    /// Work is finished
    Completed,
    /// Work cannot continue until an impediment is removed
    Blocked,
    /// Work is paused on purpose
    OnHold,
}

impl ProcessStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::NotStarted => "not_started",
            ProcessStatus::InProgress => "in_progress",
            ProcessStatus::Completed => "completed",
            ProcessStatus::Blocked => "blocked",
            ProcessStatus::OnHold => "on_hold",
        }
    }

    /// Parse a status leniently (case, spaces and dashes are ignored)
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "not_started" | "pending" => Some(ProcessStatus::NotStarted),
            "in_progress" | "started" => Some(ProcessStatus::InProgress),
            "completed" | "done" => Some(ProcessStatus::Completed),
            "blocked" => Some(ProcessStatus::Blocked),
            "on_hold" | "paused" => Some(ProcessStatus::OnHold),
            _ => None,
        }
    }
}

/// Risk classification of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Low risk
    #[default]
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
    /// Critical risk
    Critical,
}

/// A check that confirms a sub-process was carried out correctly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriteria {
    /// What is checked
    pub description: String,
    /// The result that counts as a pass
    pub expected_result: String,
    /// How the check is performed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_method: Option<String>,
}

/// Something a sub-process needs (people, material, systems)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name
    pub name: String,
    /// Resource kind (human, material, system, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    /// When or how the resource is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

/// An ordered stage of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Unique identifier, `{process_id}_phase{order}` when inferred
    pub id: String,
    /// Display name
    pub name: String,
    /// What happens in this phase
    pub description: String,
    /// Position of the phase within the process
    pub order: u32,
    /// Goals of the phase
    #[serde(default)]
    pub objectives: Vec<String>,
    /// Current state
    #[serde(default)]
    pub status: ProcessStatus,
}

impl Phase {
    /// Create a phase with no objectives in the `NotStarted` state
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        order: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            order,
            objectives: Vec::new(),
            status: ProcessStatus::NotStarted,
        }
    }
}

/// Duration, risk and KPI summary of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    /// Estimated total duration
    pub total_duration: String,
    /// Sub-process ids on the critical path
    #[serde(default)]
    pub critical_path: Vec<String>,
    /// Overall risk
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Percentage of work completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
    /// Named KPIs
    #[serde(default)]
    pub kpis: BTreeMap<String, String>,
}

/// A single step of a process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubProcess {
    /// Unique identifier (may encode a phase marker, e.g. `p1_phase2_step1`)
    pub id: String,
    /// Id of the phase this step belongs to
    pub phase_id: String,
    /// Step name
    pub name: String,
    /// Step description, replaced by detailed instructions during elaboration
    pub description: String,
    /// Execution order
    pub order: u32,
    /// Estimated duration, filled during elaboration when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
    /// Ids of steps this one depends on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Person or role responsible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Resources needed
    #[serde(default)]
    pub required_resources: Vec<Resource>,
    /// Completion checks
    #[serde(default)]
    pub validation_criteria: Vec<ValidationCriteria>,
    /// Expected outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Current state
    #[serde(default)]
    pub status: ProcessStatus,
    /// Actual duration once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<String>,
    /// Known problems
    #[serde(default)]
    pub issues: Vec<String>,
}

/// A process extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Unique identifier
    pub id: String,
    /// Process name
    pub name: String,
    /// Process description
    pub description: String,
    /// Category or kind of process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Priority, 1 (highest) to 5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Person or role responsible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Current state
    #[serde(default)]
    pub status: ProcessStatus,
    /// Phases, ordered by `order`
    #[serde(default)]
    pub phases: Vec<Phase>,
    /// Steps
    #[serde(default)]
    pub sub_processes: Vec<SubProcess>,
    /// Duration and risk summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ProcessMetrics>,
    /// Planned start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Planned end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// Interested parties
    #[serde(default)]
    pub stakeholders: Vec<String>,
    /// Related documentation, name to link
    #[serde(default)]
    pub documentation: BTreeMap<String, String>,
}

impl Process {
    /// Look up a phase by id
    pub fn phase(&self, phase_id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == phase_id)
    }

    /// Sub-processes that belong to the given phase, in execution order
    pub fn steps_in_phase(&self, phase_id: &str) -> Vec<&SubProcess> {
        let mut steps: Vec<_> = self
            .sub_processes
            .iter()
            .filter(|s| s.phase_id == phase_id)
            .collect();
        steps.sort_by_key(|s| s.order);
        steps
    }

    /// Sub-processes in execution order
    pub fn ordered_steps(&self) -> Vec<&SubProcess> {
        let mut steps: Vec<_> = self.sub_processes.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }
}
