//! Error types for gallery script conversion.

/// Result type for gallery operations.
pub type GalleryResult<T> = Result<T, GalleryError>;

/// Errors that can occur while turning a script into a notebook.
#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    /// The script has no leading module docstring.
    #[error("Not a gallery script: {0}")]
    NotLiterate(String),

    /// The leading docstring is never closed.
    #[error("Unterminated docstring starting on line {line}")]
    UnterminatedDocstring { line: usize },
}

impl From<GalleryError> for nbdocs_core::Error {
    fn from(err: GalleryError) -> Self {
        nbdocs_core::Error::Gallery(err.to_string())
    }
}
