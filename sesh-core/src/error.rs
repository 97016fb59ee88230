//! Error types for sesh-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sesh-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An export file that is unreadable or not shaped as an array of play records
    #[error("malformed input {}: {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    /// A single play record with a bad or missing field
    #[error("invalid field `{field}`: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// The input directory is missing or cannot be listed
    #[error("input directory {}: {message}", path.display())]
    InputDirectory { path: PathBuf, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// No play survived filtering
    #[error("no qualifying plays found")]
    EmptyDataset,
}

impl Error {
    pub(crate) fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::MalformedInput {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for sesh-core
pub type Result<T> = std::result::Result<T, Error>;
