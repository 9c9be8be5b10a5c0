//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ProcessFlow CLI - Turn procedure documents into structured processes.
#[derive(Debug, Parser)]
#[command(name = "processflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to ~/.processflow/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// The full document as JSON
    Json,
    /// One Markdown section per process
    Markdown,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract processes from a text document
    Extract(ExtractArgs),

    /// Write one Markdown file per process of an extracted document
    Export(ExportArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Text file to analyze
    pub file: PathBuf,

    /// Document title (defaults to the file name)
    #[arg(short, long)]
    pub title: Option<String>,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: CliFormat,

    /// Skip the elaboration pass
    #[arg(long)]
    pub no_elaborate: bool,

    /// Generative Language API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Arguments for the export command.
#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Document JSON written by `extract`
    pub document: PathBuf,

    /// Directory for the Markdown files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,
}
