//! Fakes shared by unit tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use crate::error::{Error, Result};
use crate::execute::{ExecutionError, ExecutionOptions, NotebookExecutor};
use crate::export::{Export, ExportRequest, MarkupExporter};
use crate::notebook::{Cell, CellType, Notebook};
use crate::script::ScriptConverter;

/// Source that makes [`FakeExecutor`] report a cell failure.
pub const FAILING_SOURCE: &str = "1 / 0";

/// A two-cell notebook, optionally carrying an execution flag.
pub fn notebook_json(state: Option<&str>) -> String {
    notebook_with_code("x = 1", state)
}

pub fn notebook_with_code(code: &str, state: Option<&str>) -> String {
    let mut nb = Notebook::new();
    nb.cells.push(Cell::markdown("# A"));
    nb.cells.push(Cell::code(code));
    if let Some(state) = state {
        nb.metadata
            .insert("docs_executed".to_string(), json!(state));
    }
    nb.to_json().expect("notebook serializes")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    AlwaysFail,
    Broken,
}

/// Executor that fills each code cell with a stream output.
pub struct FakeExecutor {
    mode: Mode,
    calls: AtomicUsize,
    dirs: Mutex<Vec<PathBuf>>,
}

impl FakeExecutor {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            dirs: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds unless a cell contains [`FAILING_SOURCE`].
    pub fn succeeding() -> Self {
        Self::with_mode(Mode::Normal)
    }

    /// Every run fails in a cell.
    pub fn failing() -> Self {
        Self::with_mode(Mode::AlwaysFail)
    }

    /// The engine itself is unavailable.
    pub fn broken() -> Self {
        Self::with_mode(Mode::Broken)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn working_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl NotebookExecutor for FakeExecutor {
    fn execute(
        &self,
        notebook: &Notebook,
        working_dir: &Path,
        _options: &ExecutionOptions,
    ) -> std::result::Result<Notebook, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut dirs) = self.dirs.lock() {
            dirs.push(working_dir.to_path_buf());
        }

        assert!(!notebook.has_outputs(), "executor must receive a cleared notebook");

        let fails = notebook
            .cells
            .iter()
            .any(|c| c.source.text().contains(FAILING_SOURCE));
        match self.mode {
            Mode::Broken => return Err(ExecutionError::Engine("jupyter not found".to_string())),
            Mode::AlwaysFail => {
                return Err(ExecutionError::CellFailed {
                    message: "ZeroDivisionError: division by zero".to_string(),
                    partial: None,
                });
            }
            Mode::Normal if fails => {
                return Err(ExecutionError::CellFailed {
                    message: "ZeroDivisionError: division by zero".to_string(),
                    partial: None,
                });
            }
            Mode::Normal => {}
        }

        let mut executed = notebook.clone();
        for (count, cell) in executed
            .cells
            .iter_mut()
            .filter(|c| c.cell_type == CellType::Code)
            .enumerate()
        {
            cell.execution_count = Some(Some(count as u64 + 1));
            cell.outputs = Some(vec![json!({
                "name": "stdout",
                "output_type": "stream",
                "text": ["ok\n"],
            })]);
        }
        Ok(executed)
    }
}

/// Exporter emitting a fixed body and one resource per export.
#[derive(Default)]
pub struct FakeExporter {
    keys: Mutex<Vec<String>>,
}

impl FakeExporter {
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().map(|k| k.clone()).unwrap_or_default()
    }
}

impl MarkupExporter for FakeExporter {
    fn export(&self, notebook: &Notebook, request: &ExportRequest<'_>) -> Result<Export> {
        if let Ok(mut keys) = self.keys.lock() {
            keys.push(request.unique_key.to_string());
        }
        let mut resources = BTreeMap::new();
        resources.insert(format!("{}_1_0.png", request.unique_key), vec![0x89, b'P']);
        Ok(Export {
            body: format!("{} cells\n", notebook.cells.len()),
            resources,
        })
    }
}

/// Script converter treating scripts that open with a docstring as literate.
pub struct StubScripts;

impl ScriptConverter for StubScripts {
    fn derived_notebook_path(&self, script: &Path) -> PathBuf {
        script.with_extension("ipynb")
    }

    fn is_literate(&self, source: &str) -> bool {
        source.starts_with("\"\"\"")
    }

    fn materialize(&self, source: &str) -> Result<Notebook> {
        if !self.is_literate(source) {
            return Err(Error::Gallery("not a literate script".to_string()));
        }
        let mut nb = Notebook::new();
        nb.cells.push(Cell::markdown("Generated"));
        nb.cells.push(Cell::code(source.trim_start_matches("\"\"\"Doc\"\"\"\n")));
        Ok(nb)
    }
}
