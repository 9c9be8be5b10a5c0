//! Output formatting for the CLI.

use crate::cli::CliFormat;
use crate::error::Result;
use colored::*;
use processflow_domain::Document;
use processflow_extractor::ProcessExport;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Render a document in the requested format.
    pub fn format_document(&self, document: &Document, format: CliFormat) -> Result<String> {
        match format {
            CliFormat::Json => Ok(serde_json::to_string_pretty(document)?),
            CliFormat::Markdown => Ok(render_markdown(document)),
        }
    }

    /// Summary table of the processes in a document.
    pub fn process_table(&self, document: &Document) -> String {
        if document.processes.is_empty() {
            return self.colorize("No processes found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Process", "Phases", "Steps", "Status"]);

        for process in &document.processes {
            builder.push_record([
                process.id.clone(),
                process.name.clone(),
                process.phases.len().to_string(),
                process.sub_processes.len().to_string(),
                process.status.as_str().to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Every process of a document as consecutive Markdown sections.
pub fn render_markdown(document: &Document) -> String {
    document
        .processes
        .iter()
        .map(|process| ProcessExport::from(process).render_markdown())
        .collect::<Vec<_>>()
        .join("\n")
}
