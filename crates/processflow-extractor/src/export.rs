//! Export shape for rendered process documents

use processflow_domain::Process;
use serde::{Deserialize, Serialize};

/// One step in an exported process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportStep {
    /// Step name
    pub name: String,

    /// Step description
    pub description: String,

    /// Execution order
    pub order: u32,

    /// Control criteria for the step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control: Vec<String>,
}

/// A process as handed to document renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessExport {
    /// Process name
    pub name: String,

    /// Process description
    pub description: String,

    /// Steps sorted by order
    pub sub_processes: Vec<ExportStep>,
}

impl From<&Process> for ProcessExport {
    fn from(process: &Process) -> Self {
        let sub_processes = process
            .ordered_steps()
            .into_iter()
            .map(|step| ExportStep {
                name: step.name.clone(),
                description: step.description.clone(),
                order: step.order,
                control: step
                    .validation_criteria
                    .iter()
                    .map(|c| format!("{}: {}", c.description, c.expected_result))
                    .collect(),
            })
            .collect();

        Self {
            name: process.name.clone(),
            description: process.description.clone(),
            sub_processes,
        }
    }
}

impl ProcessExport {
    /// File name stem: the process name with spaces replaced by underscores
    pub fn file_stem(&self) -> String {
        self.name
            .trim()
            .chars()
            .map(|c| match c {
                ' ' => '_',
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                other => other,
            })
            .collect()
    }

    /// Render as a Markdown document
    ///
    /// ```text
    /// # Process: {name}
    /// ## 1. SCOPE
    /// ## 2. PROCEDURE
    /// ### 2.{i}. {step}
    /// ## 3. CONTROL CRITERIA   (only when any step has criteria)
    /// ```
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("# Process: {}\n\n", self.name));

        out.push_str("## 1. SCOPE\n\n");
        out.push_str(self.description.trim());
        out.push_str("\n\n");

        out.push_str("## 2. PROCEDURE\n\n");
        for (i, step) in self.sub_processes.iter().enumerate() {
            out.push_str(&format!("### 2.{}. {}\n\n", i + 1, step.name));
            out.push_str(step.description.trim());
            out.push_str("\n\n");
        }

        let controls: Vec<&String> = self
            .sub_processes
            .iter()
            .flat_map(|step| step.control.iter())
            .collect();
        if !controls.is_empty() {
            out.push_str("## 3. CONTROL CRITERIA\n\n");
            for control in controls {
                out.push_str(&format!("- {}\n", control));
            }
            out.push('\n');
        }

        out
    }
}
