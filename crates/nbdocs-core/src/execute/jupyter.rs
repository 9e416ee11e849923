//! Execution through `jupyter nbconvert --execute`.
//!
//! The document is piped through stdin/stdout so nbconvert has no input
//! file of its own; the kernel then starts in the process working
//! directory, which we set to the notebook's directory.

use std::io::Write;
use std::path::Path;
use std::process::Stdio;

use super::toolchain::JupyterToolchain;
use super::{ExecutionError, ExecutionOptions, NotebookExecutor};
use crate::notebook::Notebook;

/// Markers nbconvert prints to stderr for notebook-level failures.
const CELL_ERROR_MARKER: &str = "CellExecutionError";
const TIMEOUT_MARKERS: [&str; 2] = ["CellTimeoutError", "TimeoutError"];

/// Lines of stderr kept in error messages.
const STDERR_TAIL: usize = 20;

/// Executes notebooks with the Jupyter toolchain.
#[derive(Debug, Clone)]
pub struct JupyterExecutor {
    toolchain: JupyterToolchain,
}

impl JupyterExecutor {
    /// Create an executor using the given toolchain.
    pub fn new(toolchain: JupyterToolchain) -> Self {
        Self { toolchain }
    }

    /// nbconvert arguments for one run.
    fn arguments(options: &ExecutionOptions) -> Vec<String> {
        let mut args = vec![
            "--to".to_string(),
            "notebook".to_string(),
            "--execute".to_string(),
            "--stdin".to_string(),
            "--stdout".to_string(),
            format!("--ExecutePreprocessor.timeout={}", options.timeout.as_secs()),
            format!("--ExecutePreprocessor.kernel_name={}", options.kernel),
        ];
        if options.allow_errors {
            args.push("--allow-errors".to_string());
        }
        args
    }
}

/// Sort nbconvert's stderr into a failure class.
fn classify_failure(stderr: &str, options: &ExecutionOptions) -> ExecutionError {
    let tail = stderr_tail(stderr);

    if TIMEOUT_MARKERS.iter().any(|m| stderr.contains(m)) {
        ExecutionError::Timeout(options.timeout)
    } else if stderr.contains(CELL_ERROR_MARKER) {
        ExecutionError::CellFailed {
            message: tail,
            partial: None,
        }
    } else {
        ExecutionError::Engine(format!("nbconvert failed: {}", tail))
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL);
    lines[start..].join("\n")
}

impl NotebookExecutor for JupyterExecutor {
    fn execute(
        &self,
        notebook: &Notebook,
        working_dir: &Path,
        options: &ExecutionOptions,
    ) -> Result<Notebook, ExecutionError> {
        let input = notebook
            .to_json()
            .map_err(|e| ExecutionError::Engine(e.to_string()))?;

        tracing::debug!(
            "Running {} nbconvert in {}",
            self.toolchain.jupyter_path().display(),
            working_dir.display()
        );

        let mut child = self
            .toolchain
            .nbconvert()
            .args(Self::arguments(options))
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::Engine(format!("Failed to run jupyter: {}", e)))?;

        // nbconvert reads all of stdin before executing, so writing first
        // cannot deadlock against its stdout.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                // Reap the child before bailing out.
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecutionError::Engine(format!(
                    "Failed to send notebook: {}",
                    e
                )));
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ExecutionError::Engine(format!("Failed to wait for jupyter: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr, options));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Notebook::from_json(&stdout).map_err(|e| {
            ExecutionError::Engine(format!("nbconvert returned an invalid notebook: {}", e))
        })
    }
}
