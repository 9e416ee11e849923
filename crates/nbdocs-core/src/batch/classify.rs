//! Pure file classification.
//!
//! [`classify`] looks only at the path; [`plan`] combines the result with
//! the run options. Neither touches the filesystem.

use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::paths::{
    CHECKPOINT_DIR, CLOUD_PREFIX, EXECUTED_PREFIX, MARKUP_EXTENSION, NOTEBOOK_EXTENSION,
    OUTPUT_FILES_DIR, SCRIPT_EXTENSION,
};

use super::ProcessOptions;

/// What a file is, by name. Rules are checked top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Inside a `.ipynb_checkpoints` directory.
    Checkpoint,
    /// `executed_*`: output of an earlier pass.
    ExecutedArtifact,
    /// `colab_*`: cloud-compatible copy.
    CloudCopy,
    /// `*.rst`: generated markup.
    Markup,
    /// Anything inside an `nboutput` directory.
    GeneratedAsset,
    /// `*.ipynb` source notebook.
    Notebook,
    /// `*.py` literate script candidate.
    Script,
    /// Not ours.
    Other,
}

impl FileKind {
    /// Whether this kind is produced by nbdocs and removed on cleanup.
    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            FileKind::Checkpoint
                | FileKind::ExecutedArtifact
                | FileKind::CloudCopy
                | FileKind::Markup
                | FileKind::GeneratedAsset
        )
    }
}

/// What to do with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Leave it alone.
    Skip,
    /// Remove it.
    Delete,
    /// Run the notebook steps.
    ProcessNotebook,
    /// Materialize and run, or clean up, a literate script.
    ProcessScript,
}

/// Classify a path, ideally relative to the walk root.
pub fn classify(path: &Path) -> FileKind {
    if path.components().any(|c| c.as_os_str() == CHECKPOINT_DIR) {
        return FileKind::Checkpoint;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.starts_with(EXECUTED_PREFIX) {
        return FileKind::ExecutedArtifact;
    }
    if name.starts_with(CLOUD_PREFIX) {
        return FileKind::CloudCopy;
    }

    let extension = path.extension().and_then(|e| e.to_str());
    if extension == Some(MARKUP_EXTENSION) {
        return FileKind::Markup;
    }

    let in_output_dir = path
        .parent()
        .is_some_and(|p| p.components().any(|c| c.as_os_str() == OUTPUT_FILES_DIR));
    if in_output_dir {
        return FileKind::GeneratedAsset;
    }

    match extension {
        Some(NOTEBOOK_EXTENSION) => FileKind::Notebook,
        Some(SCRIPT_EXTENSION) => FileKind::Script,
        _ => FileKind::Other,
    }
}

/// Regex searched for in file names. An empty pattern matches everything.
#[derive(Debug, Clone)]
pub struct NameFilter {
    pattern: Option<Regex>,
}

impl NameFilter {
    /// Compile a filter.
    ///
    /// # Errors
    /// [`crate::Error::InvalidFilter`] if the pattern is not a valid regex.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(Self { pattern })
    }

    /// Whether `file_name` is selected.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|re| re.is_match(file_name))
    }
}

/// Decide what to do with a file of `kind` named `file_name`.
pub fn plan(
    kind: FileKind,
    file_name: &str,
    options: &ProcessOptions,
    filter: &NameFilter,
) -> Action {
    if kind.is_generated() {
        return if options.cleanup {
            Action::Delete
        } else {
            Action::Skip
        };
    }

    match kind {
        FileKind::Notebook if filter.matches(file_name) => Action::ProcessNotebook,
        FileKind::Script if filter.matches(file_name) => Action::ProcessScript,
        _ => Action::Skip,
    }
}
