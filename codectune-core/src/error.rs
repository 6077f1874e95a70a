use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for codectune
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Cannot remove mandatory option: {0}")]
    CannotRemoveMandatory(String),

    #[error("Stored hashname {stored} does not match recovered parameters (computed {computed})")]
    HashMismatch { stored: String, computed: String },

    #[error("No stored parameters for encoder {0}")]
    EncoderNotFound(String),

    #[error("Corrupt result file {path}: {reason}")]
    CorruptResult { path: PathBuf, reason: String },

    #[error("Encoding has no result: {0}")]
    MissingResult(String),

    #[error("Invalid video filename: {0}")]
    InvalidVideoFilename(String),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Result type for codectune operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;
