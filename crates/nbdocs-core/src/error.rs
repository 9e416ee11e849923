//! Error types for nbdocs-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for nbdocs-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nbdocs-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file.
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// Failed to write a file.
    #[error("failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Failed to delete a file.
    #[error("failed to delete {path}: {message}")]
    Delete { path: PathBuf, message: String },

    /// An artifact an operation depends on has not been produced yet.
    #[error("expected artifact does not exist: {0}")]
    MissingArtifact(PathBuf),

    /// The document is not a notebook we can process.
    #[error("invalid notebook: {0}")]
    InvalidNotebook(String),

    /// The execution engine could not run at all.
    #[error("execution engine error: {0}")]
    Engine(String),

    /// Markup export failed.
    #[error("export error: {0}")]
    Export(String),

    /// Script to notebook materialization failed.
    #[error("gallery conversion error: {0}")]
    Gallery(String),

    /// The file name filter is not a valid regular expression.
    #[error("invalid name filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Render the error together with a recovery hint, when one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::MissingArtifact(_) => {
                Some("execute the notebook first, or drop --rst when running with --no-execute")
            }
            Error::Engine(_) => Some("make sure `jupyter nbconvert` is installed and on PATH"),
            Error::Export(_) => Some("check the RST template path and that pandoc is installed"),
            Error::InvalidFilter(_) => Some("--filter takes a regular expression, e.g. '^plot_'"),
            Error::Delete { .. } => Some("check file permissions in the documentation tree"),
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}
