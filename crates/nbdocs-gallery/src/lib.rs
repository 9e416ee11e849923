//! Gallery script conversion for nbdocs.
//!
//! Turns sphinx-gallery style Python scripts into notebooks.
//!
//! # Architecture
//!
//! ```text
//! plot_foo.py ─────► ScriptParser ─────► ParsedScript ─────► NotebookGenerator ─────► plot_foo.ipynb
//!                                                                   │
//!                                                                   ▼
//!                                                       mayavi notebook backend
//! ```

mod error;
mod notebook;
mod parser;

pub use error::{GalleryError, GalleryResult};
pub use notebook::{NotebookGenerator, init_mayavi, rst_to_markdown};
pub use parser::{Block, BlockKind, ParsedScript, ScriptParser};

use std::path::{Path, PathBuf};

use nbdocs_core::{FileSystem, Notebook, ScriptConverter};

/// Get the notebook path a script materializes to.
pub fn default_notebook_path(script: impl AsRef<Path>) -> PathBuf {
    script.as_ref().with_extension("ipynb")
}

/// [`ScriptConverter`] for gallery scripts.
#[derive(Debug, Clone, Default)]
pub struct GalleryConverter {
    parser: ScriptParser,
    generator: NotebookGenerator,
}

impl GalleryConverter {
    /// Create a new converter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source` and build its notebook.
    pub fn convert_source(&self, source: &str) -> GalleryResult<Notebook> {
        let script = self.parser.parse_source(source)?;
        let notebook = self.generator.generate(&script);

        tracing::debug!(
            "Generated notebook for {:?} ({} cells)",
            script.title().unwrap_or("untitled"),
            notebook.cells.len()
        );

        Ok(notebook)
    }

    /// Convert a script on disk, writing the notebook next to it.
    pub fn convert_file(&self, fs: &dyn FileSystem, script: &Path) -> nbdocs_core::Result<PathBuf> {
        let source = fs.read_to_string(script).map_err(|e| nbdocs_core::Error::Read {
            path: script.to_path_buf(),
            message: e.to_string(),
        })?;
        let notebook = self.convert_source(&source)?;
        let path = default_notebook_path(script);
        notebook.write_to(fs, &path)?;

        tracing::info!(
            "Converted {} → {} ({} cells)",
            script.display(),
            path.display(),
            notebook.cells.len()
        );

        Ok(path)
    }
}

impl ScriptConverter for GalleryConverter {
    fn derived_notebook_path(&self, script: &Path) -> PathBuf {
        default_notebook_path(script)
    }

    fn is_literate(&self, source: &str) -> bool {
        self.parser.is_literate(source)
    }

    fn materialize(&self, source: &str) -> nbdocs_core::Result<Notebook> {
        Ok(self.convert_source(source)?)
    }
}
