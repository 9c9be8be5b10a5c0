//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use processflow_domain::{Document, LlmProvider};
use processflow_extractor::ProcessFlow;
use processflow_llm::GeminiProvider;
use processflow_ratelimit::CallExecutor;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Execute the extract command against the configured Gemini model.
pub async fn execute_extract(args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| CliError::InvalidInput("No API key. Set GEMINI_API_KEY or pass --api-key".to_string()))?;

    let mut provider = GeminiProvider::with_timeout(api_key, &config.provider.model, config.provider.timeout())?;
    if let Some(endpoint) = &config.provider.endpoint {
        provider = provider.with_endpoint(endpoint);
    }

    run_extract(provider, args, config, formatter).await
}

/// Run extraction with any provider.
pub async fn run_extract<L>(provider: L, args: ExtractArgs, config: &Config, formatter: &Formatter) -> Result<()>
where
    L: LlmProvider,
    L::Error: fmt::Display,
{
    let content = fs::read_to_string(&args.file)?;
    if content.trim().is_empty() {
        return Err(CliError::InvalidInput(format!("{} is empty", args.file.display())));
    }

    let mut extractor_config = config.extractor.clone();
    if args.no_elaborate {
        extractor_config.elaborate = false;
    }

    let title = args.title.clone().or_else(|| title_from_path(&args.file));
    info!("Extracting processes from {} with {}", args.file.display(), provider.model_name());

    let executor = CallExecutor::new(config.quota.clone())?;
    let flow = ProcessFlow::new(provider, executor, extractor_config)?;
    let (document, outcome) = flow.process_document_detailed(&content, title.as_deref()).await?;

    let rendered = formatter.format_document(&document, args.format)?;
    match &args.output {
        Some(path) => {
            write_output(path, &rendered)?;
            eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
        None => println!("{}", rendered),
    }

    eprintln!("{}", formatter.process_table(&document));
    if !outcome.rejected.is_empty() {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "{} candidate process(es) rejected as unsupported by the document",
                outcome.rejected.len()
            ))
        );
    }
    eprintln!("{}", formatter.info(&flow.usage().to_string()));

    Ok(())
}

/// Document title derived from a file name: `inventory_manual.txt` becomes
/// `inventory manual`.
pub fn title_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let title = stem.replace(['_', '-'], " ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

/// Load a document previously written by `extract --format json`.
pub fn read_document(path: &Path) -> Result<Document> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliFormat;
    use processflow_llm::MockProvider;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONTENT: &str = "Step 1: Open inventory. Step 2: Click new.";

    const RESPONSE: &str = r#"[{"id": "process_1", "name": "Open inventory", "sub_processes": [
        {"name": "Open inventory", "description": "Open inventory", "order": 1},
        {"name": "Click new", "description": "Click new", "order": 2}]}]"#;

    fn args(file: PathBuf, output: Option<PathBuf>) -> ExtractArgs {
        ExtractArgs {
            file,
            title: None,
            output,
            format: CliFormat::Json,
            no_elaborate: true,
            api_key: None,
        }
    }

    #[test]
    fn test_title_from_path() {
        assert_eq!(
            title_from_path(Path::new("docs/inventory_manual.txt")).as_deref(),
            Some("inventory manual")
        );
        assert_eq!(title_from_path(Path::new("")), None);
    }

    #[tokio::test]
    async fn test_extract_writes_document() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("inventory-intake.txt");
        let output = dir.path().join("out").join("document.json");
        fs::write(&input, CONTENT).unwrap();

        let provider = MockProvider::new(RESPONSE);
        run_extract(
            provider.clone(),
            args(input, Some(output.clone())),
            &Config::default(),
            &Formatter::new(false),
        )
        .await
        .unwrap();

        let document = read_document(&output).unwrap();
        assert_eq!(document.title, "inventory intake");
        assert_eq!(document.processes.len(), 1);
        assert_eq!(document.processes[0].sub_processes.len(), 2);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("empty.txt");
        fs::write(&input, "   \n").unwrap();

        let provider = MockProvider::new(RESPONSE);
        let result = run_extract(provider.clone(), args(input, None), &Config::default(), &Formatter::new(false)).await;

        assert!(matches!(result, Err(CliError::InvalidInput(_))));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let result = execute_extract(
            args(PathBuf::from("unused.txt"), None),
            &Config::default(),
            &Formatter::new(false),
        )
        .await;
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
