// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("Malformed line {line_number}: {cause}\n\t{line:?}")]
    MalformedLine {
        line_number: usize,
        line: String,
        cause: String,
    },

    #[error("Data block {block} opened at line {opened_at} never reaches its _END line")]
    IncompleteBlock { block: String, opened_at: usize },
}

impl TokenizeError {
    pub(crate) fn malformed(line_number: usize, line: &str, cause: impl Into<String>) -> Self {
        TokenizeError::MalformedLine {
            line_number,
            line: line.to_string(),
            cause: cause.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Tokenization failed: {0}")]
    Tokenize(#[from] TokenizeError), // Automatically convert tokenizer errors

    #[error("Token stream ended before !#ENDFILE")]
    UnexpectedEndOfStream,

    #[error("Data block {0} is not closed before its section ends")]
    UnclosedBlock(String),

    #[error("Unexpected token {0} in token stream")]
    UnexpectedToken(String),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: DocumentError,
    },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid item key '{0}', expected SECTION_CODE:KEY")]
    InvalidKey(String),

    #[error("Unknown section code: {0}")]
    UnknownSection(String),

    #[error("Regular expression error: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Parsing failed: {0}")]
    Document(#[from] DocumentError),

    #[error("Input failed: {0}")]
    Input(#[from] InputError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
