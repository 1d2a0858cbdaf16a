// src/main.rs
use clap::{Parser, Subcommand, ValueEnum};
use mwtab::document::MwTabFile;
use mwtab::extractors::{extract_metabolites, extract_metadata, ItemMatcher};
use mwtab::input;
use mwtab::storage::StorageManager;
use mwtab::tokenizer::Tokenizer;
use mwtab::utils::{self, error::DocumentError, AppError};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Command Line Interface for mwTab files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the token stream of an mwTab file, one JSON object per line
    Tokens {
        /// mwTab file to tokenize
        path: PathBuf,
    },

    /// Parse mwTab files and save each one as <STUDY_ID>_<ANALYSIS_ID>.json
    Convert {
        /// mwTab file or directory of mwTab files
        from: PathBuf,

        /// Output directory
        #[arg(default_value = "./output")]
        to_dir: PathBuf,
    },

    /// Count, per metabolite, the studies, analyses and samples it was measured in
    ExtractMetabolites {
        /// mwTab file or directory of mwTab files
        from: PathBuf,

        /// Output path, without extension
        to_path: PathBuf,

        /// Item to filter on, as SECTION_CODE:KEY (e.g. SU:SUBJECT_TYPE); pairs with --value
        #[arg(short, long)]
        key: Vec<String>,

        /// Expected value for the matching --key; write r'...' for a regular expression
        #[arg(short, long)]
        value: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        to_format: OutputFormat,

        /// Omit the CSV header row
        #[arg(long)]
        no_header: bool,
    },

    /// Collect every distinct value of the given metadata keys
    ExtractMetadata {
        /// mwTab file or directory of mwTab files
        from: PathBuf,

        /// Output path, without extension
        to_path: PathBuf,

        /// Metadata key to collect (e.g. SUBJECT_TYPE)
        #[arg(short, long, required = true)]
        key: Vec<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        to_format: OutputFormat,

        /// Omit the CSV header row
        #[arg(long)]
        no_header: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    match args.command {
        Command::Tokens { path } => print_tokens(&path).await,
        Command::Convert { from, to_dir } => convert(&from, &to_dir).await,
        Command::ExtractMetabolites {
            from,
            to_path,
            key,
            value,
            to_format,
            no_header,
        } => {
            if key.len() != value.len() {
                return Err(AppError::Config(format!(
                    "Got {} --key and {} --value arguments, they must pair up",
                    key.len(),
                    value.len()
                )));
            }
            let matchers = key
                .iter()
                .zip(&value)
                .map(|(k, v)| ItemMatcher::parse(k, v))
                .collect::<Result<Vec<_>, _>>()?;

            let documents = load_documents(&from).await?;
            let metabolites = extract_metabolites(&documents, &matchers);

            let (storage, stem) = storage_for(&to_path)?;
            let path = match to_format {
                OutputFormat::Csv => storage.save_metabolites_csv(&stem, &metabolites, no_header)?,
                OutputFormat::Json => storage.save_json(&stem, &metabolites)?,
            };
            tracing::info!("Saved metabolites to: {}", path.display());
            Ok(())
        }
        Command::ExtractMetadata {
            from,
            to_path,
            key,
            to_format,
            no_header,
        } => {
            let documents = load_documents(&from).await?;
            let metadata = extract_metadata(&documents, &key);

            let (storage, stem) = storage_for(&to_path)?;
            let path = match to_format {
                OutputFormat::Csv => storage.save_metadata_csv(&stem, &metadata, no_header)?,
                OutputFormat::Json => storage.save_json(&stem, &metadata)?,
            };
            tracing::info!("Saved metadata to: {}", path.display());
            Ok(())
        }
    }
}

async fn print_tokens(path: &Path) -> Result<(), AppError> {
    let text = tokio::fs::read_to_string(path).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for token in Tokenizer::new(&text) {
        let token = token.map_err(DocumentError::from)?;
        let line = serde_json::to_string(&token)
            .map_err(|e| AppError::Processing(format!("Failed to serialize token: {}", e)))?;
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

async fn convert(from: &Path, to_dir: &Path) -> Result<(), AppError> {
    let storage = StorageManager::new(to_dir)?;
    tracing::info!("Writing converted files to: {}", storage.base_dir().display());
    let paths = input::find_mwtab_files(from).await?;
    let mut success_count = 0;
    let mut failure_count = 0;

    for path in paths {
        match input::load_document(&path).await {
            Ok(document) => {
                let stem = document_stem(&document, &path);
                match storage.save_json(&stem, &document) {
                    Ok(saved) => {
                        tracing::info!("Converted {} to {}", path.display(), saved.display());
                        success_count += 1;
                    }
                    Err(e) => {
                        tracing::error!("Failed to save {}: {}", stem, e);
                        failure_count += 1;
                    }
                }
            }
            Err(e) => {
                tracing::error!("{}", e);
                failure_count += 1;
            }
        }
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!("Failed to convert any of {} files", failure_count)));
    }
    Ok(())
}

/// Loads every parsable file under `from`, logging and skipping the ones that fail.
async fn load_documents(from: &Path) -> Result<Vec<MwTabFile>, AppError> {
    let paths = input::find_mwtab_files(from).await?;
    tracing::info!("Found {} mwTab files under {}", paths.len(), from.display());

    let mut documents = Vec::with_capacity(paths.len());
    let mut failure_count = 0;
    for path in &paths {
        match input::load_document(path).await {
            Ok(document) => documents.push(document),
            Err(e) => {
                tracing::error!("{}", e);
                failure_count += 1;
            }
        }
    }

    tracing::info!("Parsed {} files, {} failures", documents.len(), failure_count);
    if documents.is_empty() && failure_count > 0 {
        return Err(AppError::Processing(format!("Failed to parse any of {} files", failure_count)));
    }
    Ok(documents)
}

/// Splits `results/metabolites` into a storage rooted at `results` and the stem `metabolites`.
fn storage_for(to_path: &Path) -> Result<(StorageManager, String), AppError> {
    let stem = to_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| AppError::Config(format!("Invalid output path: {}", to_path.display())))?
        .to_string();
    let dir = to_path.parent().unwrap_or_else(|| Path::new(""));
    Ok((StorageManager::new(dir)?, stem))
}

fn document_stem(document: &MwTabFile, path: &Path) -> String {
    match (document.study_id(), document.analysis_id()) {
        (Some(study), Some(analysis)) => format!("{}_{}", study, analysis),
        _ => path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string()),
    }
}
