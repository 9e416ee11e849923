//! Notebook execution.
//!
//! Execution itself is delegated to an engine behind [`NotebookExecutor`].
//! The engine receives an output-free document and a working directory and
//! either returns the document with outputs populated, or reports why it
//! could not.
//!
//! # Failure classes
//!
//! ```text
//! ExecutionError
//!     ├── CellFailed  ─┐ recorded as "errored" in notebook metadata,
//!     ├── Timeout     ─┘ the batch moves on
//!     └── Engine        propagated: the environment is broken
//! ```
//!
//! # Module Structure
//!
//! - `jupyter` - `JupyterExecutor`, driving `jupyter nbconvert --execute`
//! - `toolchain` - locating the Jupyter executable

mod jupyter;
mod toolchain;

pub use jupyter::JupyterExecutor;
pub use toolchain::JupyterToolchain;

use std::path::Path;
use std::time::Duration;

use crate::notebook::Notebook;

/// Per-cell timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(900);

/// Kernel used when none is configured.
pub const DEFAULT_KERNEL: &str = "python3";

/// Settings handed to the engine for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Upper bound for a single cell.
    pub timeout: Duration,

    /// Kernel name, e.g. `python3`.
    pub kernel: String,

    /// Keep running after a failing cell instead of aborting the run.
    pub allow_errors: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            kernel: DEFAULT_KERNEL.to_string(),
            allow_errors: false,
        }
    }
}

/// Why a run did not produce an executed notebook.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// A cell raised; the rest of the run was abandoned.
    #[error("cell execution failed: {message}")]
    CellFailed {
        message: String,
        /// Partially executed document, when the engine hands one back.
        partial: Option<Box<Notebook>>,
    },

    /// A cell exceeded the configured timeout.
    #[error("cell timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The engine could not be started or returned garbage.
    #[error("{0}")]
    Engine(String),
}

impl ExecutionError {
    /// Whether this failure belongs to the notebook rather than the
    /// environment, i.e. whether the batch should record it and continue.
    pub fn is_notebook_failure(&self) -> bool {
        matches!(
            self,
            ExecutionError::CellFailed { .. } | ExecutionError::Timeout(_)
        )
    }
}

/// Runs every cell of a notebook in order.
pub trait NotebookExecutor {
    /// Execute `notebook` with `working_dir` as the kernel's current
    /// directory, returning the document with outputs populated.
    fn execute(
        &self,
        notebook: &Notebook,
        working_dir: &Path,
        options: &ExecutionOptions,
    ) -> Result<Notebook, ExecutionError>;
}
