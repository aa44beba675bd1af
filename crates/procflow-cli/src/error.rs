use procflow::engine::error::{CheckError, NodeError, ParseError, StructuredError};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read procedure '{path}': {source}", path = path.display())]
    Procedure {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Structural check failed: {0}")]
    Check(#[from] CheckError),

    #[error(transparent)]
    Structured(#[from] StructuredError),

    #[error("Procedure run failed: {0}")]
    Run(#[from] NodeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
