//! Derived paths for a notebook.
//!
//! Naming conventions shared by the converter, which produces these files,
//! and the batch walker, which recognizes them on later passes:
//!
//! ```text
//! docs/
//! ├── intro.ipynb              # source (executed in place when overwriting)
//! ├── executed_intro.ipynb     # executed copy, or the overwrite scratch file
//! ├── colab_intro.ipynb        # cloud-compatible copy
//! ├── intro.rst                # markup export
//! └── nboutput/                # export side artifacts (plots, ...)
//! notebooks_external/
//! └── intro.nblink             # {"path": "../docs/intro.ipynb"}
//! ```

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Prefix of executed copies and of the overwrite scratch file.
pub const EXECUTED_PREFIX: &str = "executed_";

/// Prefix of cloud-compatible copies.
pub const CLOUD_PREFIX: &str = "colab_";

/// Directory name Jupyter uses for autosave checkpoints.
pub const CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

/// Subdirectory holding export side artifacts.
pub const OUTPUT_FILES_DIR: &str = "nboutput";

/// Default directory for link descriptors.
pub const DEFAULT_LINKS_DIR: &str = "notebooks_external";

pub const NOTEBOOK_EXTENSION: &str = "ipynb";
pub const MARKUP_EXTENSION: &str = "rst";
pub const SCRIPT_EXTENSION: &str = "py";
pub const LINK_EXTENSION: &str = "nblink";

/// Every path derived from one source notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPaths {
    /// Absolute path of the source notebook.
    pub source: PathBuf,

    /// Directory containing the source notebook.
    pub notebook_dir: PathBuf,

    /// File name, e.g. `intro.ipynb`.
    pub file_name: String,

    /// File stem, e.g. `intro`.
    pub stem: String,

    /// Directory receiving executed, cloud and markup files.
    pub output_dir: PathBuf,

    /// Where the executed notebook ends up.
    pub executed: PathBuf,

    /// Scratch file for the atomic overwrite; `None` when not overwriting.
    pub temp: Option<PathBuf>,

    /// Cloud-compatible copy.
    pub cloud: PathBuf,

    /// Directory of link descriptors.
    pub links_dir: PathBuf,

    /// This notebook's link descriptor.
    pub link: PathBuf,
}

impl NotebookPaths {
    /// Derive all paths for `notebook`.
    ///
    /// Relative inputs are resolved against the current directory. Nothing
    /// is created on disk.
    ///
    /// # Errors
    /// Returns an error if the path has no file name or cannot be made
    /// absolute.
    pub fn new(
        notebook: &Path,
        output_dir: Option<&Path>,
        links_dir: &Path,
        overwrite: bool,
    ) -> Result<Self> {
        let source = std::path::absolute(notebook)?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidNotebook(format!("{} has no file name", notebook.display()))
            })?;
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        let notebook_dir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));

        let output_dir = match output_dir {
            Some(dir) => std::path::absolute(dir)?,
            None => notebook_dir.clone(),
        };

        let prefixed = output_dir.join(format!("{}{}", EXECUTED_PREFIX, file_name));
        let (executed, temp) = if overwrite {
            (output_dir.join(&file_name), Some(prefixed))
        } else {
            (prefixed, None)
        };

        let cloud = output_dir.join(format!("{}{}", CLOUD_PREFIX, file_name));
        let links_dir = std::path::absolute(links_dir)?;
        let link = links_dir.join(format!("{}.{}", stem, LINK_EXTENSION));

        Ok(Self {
            source,
            notebook_dir,
            file_name,
            stem,
            output_dir,
            executed,
            temp,
            cloud,
            links_dir,
            link,
        })
    }

    /// Path of the markup export.
    pub fn markup(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.stem, MARKUP_EXTENSION))
    }

    /// Directory of export side artifacts.
    pub fn output_files_dir(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILES_DIR)
    }

    /// Source path relative to the links directory.
    pub fn source_relative_to_links(&self) -> PathBuf {
        pathdiff::diff_paths(&self.source, &self.links_dir).unwrap_or_else(|| self.source.clone())
    }
}
