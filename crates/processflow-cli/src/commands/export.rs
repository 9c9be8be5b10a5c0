//! Export command implementation.

use crate::cli::ExportArgs;
use crate::commands::extract::read_document;
use crate::error::Result;
use crate::output::Formatter;
use processflow_domain::Document;
use processflow_extractor::ProcessExport;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Execute the export command.
pub fn execute_export(args: ExportArgs, formatter: &Formatter) -> Result<()> {
    let document = read_document(&args.document)?;
    let written = export_document(&document, &args.output_dir)?;

    if written.is_empty() {
        println!("{}", formatter.warning("Document has no processes to export"));
    }
    for path in &written {
        println!("{}", formatter.success(&format!("Wrote {}", path.display())));
    }

    Ok(())
}

/// Write one `<process name>.md` per process into `dir`.
///
/// Returns the written paths in process order.
pub fn export_document(document: &Document, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(document.processes.len());
    for process in &document.processes {
        let export = ProcessExport::from(process);
        let mut stem = export.file_stem();
        if stem.is_empty() {
            stem = process.id.clone();
        }

        let path = dir.join(format!("{}.md", stem));
        debug!("Exporting process '{}' to {}", process.name, path.display());
        fs::write(&path, export.render_markdown())?;
        written.push(path);
    }

    Ok(written)
}
