//! Literate scripts that materialize into notebooks.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::notebook::Notebook;

/// Turns gallery-style scripts into notebooks.
pub trait ScriptConverter {
    /// The notebook path a script materializes to. Deterministic.
    fn derived_notebook_path(&self, script: &Path) -> PathBuf;

    /// Whether `source` follows the literate-script convention.
    fn is_literate(&self, source: &str) -> bool;

    /// Build the notebook for a script's text.
    fn materialize(&self, source: &str) -> Result<Notebook>;
}
