//! Per-notebook operations.
//!
//! A [`NotebookConverter`] is bound to one notebook file and owns every path
//! derived from it. State between runs lives in the notebook itself, under
//! the `docs_executed` metadata key:
//!
//! ```text
//!            execute ok                unexecute
//!   absent ─────────────► executed ─────────────► absent
//!      │                     ▲
//!      │ execute fails       │ execute ok (errored is always retried)
//!      └──────────────► errored
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Value, json};

use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::execute::{ExecutionError, ExecutionOptions, NotebookExecutor};
use crate::export::{ExportRequest, MarkupExporter, write_export};
use crate::fs::FileSystem;
use crate::notebook::{ExecutionState, Notebook};
use crate::paths::{NotebookPaths, OUTPUT_FILES_DIR};
use crate::script::ScriptConverter;

/// The collaborators a conversion runs against.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub fs: &'a dyn FileSystem,
    pub executor: &'a dyn NotebookExecutor,
    pub exporter: &'a dyn MarkupExporter,
    pub scripts: &'a dyn ScriptConverter,
}

/// What `execute` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Already executed and not forced; nothing was touched.
    Skipped,
    /// Ran cleanly.
    Executed,
    /// A cell failed; recorded and written.
    Errored,
}

/// Result of [`NotebookConverter::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedNotebook {
    /// Where the executed notebook lives.
    pub path: PathBuf,
    /// What happened.
    pub outcome: ExecuteOutcome,
    /// Time spent in the engine.
    pub elapsed: Duration,
}

/// Content of a `.nblink` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDescriptor {
    pub path: String,
}

/// Operations on one notebook.
pub struct NotebookConverter<'a> {
    paths: NotebookPaths,
    rst_template: Option<PathBuf>,
    colab_template: Option<PathBuf>,
    execution: ExecutionOptions,
    services: Services<'a>,
}

impl<'a> NotebookConverter<'a> {
    /// Bind a converter to `notebook`.
    ///
    /// Creates the configured output directory if it does not exist.
    pub fn new(notebook: &Path, config: &ConverterConfig, services: Services<'a>) -> Result<Self> {
        let paths = NotebookPaths::new(
            notebook,
            config.output_dir.as_deref(),
            &config.links_dir,
            config.overwrite,
        )?;

        if config.output_dir.is_some() {
            create_dir(services.fs, &paths.output_dir)?;
        }

        let rst_template = config
            .rst_template
            .as_deref()
            .map(std::path::absolute)
            .transpose()?;
        let colab_template = config
            .colab_template
            .as_deref()
            .map(std::path::absolute)
            .transpose()?;

        Ok(Self {
            paths,
            rst_template,
            colab_template,
            execution: config.execution_options(),
            services,
        })
    }

    /// Derived paths.
    pub fn paths(&self) -> &NotebookPaths {
        &self.paths
    }

    /// Execute the notebook unless it is already marked executed.
    ///
    /// Outputs are cleared before running. A failing cell marks the notebook
    /// `errored` and is not returned as an error; the caller can move on to
    /// the next notebook. When overwriting, the result is written to a
    /// scratch file first and copied over the source, so an interrupted
    /// write never truncates the canonical notebook.
    pub fn execute(&self, force: bool) -> Result<ExecutedNotebook> {
        let fs = self.services.fs;
        let mut notebook = Notebook::read_from(fs, &self.paths.source)?;

        if notebook.execution_state() == Some(ExecutionState::Executed) && !force {
            tracing::info!(
                "Notebook {} in {} already executed, skipping",
                self.paths.file_name,
                self.paths.notebook_dir.display()
            );
            return Ok(ExecutedNotebook {
                path: self.paths.executed.clone(),
                outcome: ExecuteOutcome::Skipped,
                elapsed: Duration::ZERO,
            });
        }

        tracing::info!(
            "Executing notebook {} in {}",
            self.paths.file_name,
            self.paths.notebook_dir.display()
        );
        let start = Instant::now();

        notebook.clear_outputs();

        let (mut notebook, outcome) = match self.services.executor.execute(
            &notebook,
            &self.paths.notebook_dir,
            &self.execution,
        ) {
            Ok(executed) => (executed, ExecuteOutcome::Executed),
            Err(err) if err.is_notebook_failure() => {
                tracing::error!("Error executing notebook {}", self.paths.file_name);
                tracing::error!("{}", err);
                let partial = match err {
                    ExecutionError::CellFailed {
                        partial: Some(partial),
                        ..
                    } => *partial,
                    _ => notebook,
                };
                (partial, ExecuteOutcome::Errored)
            }
            Err(err) => return Err(Error::Engine(err.to_string())),
        };

        notebook.set_execution_state(match outcome {
            ExecuteOutcome::Errored => ExecutionState::Errored,
            _ => ExecutionState::Executed,
        });

        let elapsed = start.elapsed();
        tracing::info!("Finished running notebook ({:.2}s)", elapsed.as_secs_f64());
        tracing::info!(
            "Writing executed notebook to {}",
            self.paths.executed.display()
        );

        match &self.paths.temp {
            Some(temp) => {
                notebook.write_to(fs, temp)?;
                fs.copy(temp, &self.paths.executed)
                    .map_err(|e| Error::Write {
                        path: self.paths.executed.clone(),
                        message: e.to_string(),
                    })?;
                remove(fs, temp)?;
            }
            None => notebook.write_to(fs, &self.paths.executed)?,
        }

        Ok(ExecutedNotebook {
            path: self.paths.executed.clone(),
            outcome,
            elapsed,
        })
    }

    /// Export the executed notebook to reStructuredText.
    ///
    /// # Errors
    /// [`Error::MissingArtifact`] if the executed notebook does not exist.
    pub fn convert(&self) -> Result<PathBuf> {
        let fs = self.services.fs;
        if !fs.exists(&self.paths.executed) {
            return Err(Error::MissingArtifact(self.paths.executed.clone()));
        }

        tracing::info!("Exporting executed notebook to RST format");
        let notebook = Notebook::read_from(fs, &self.paths.executed)?;
        let request = ExportRequest {
            unique_key: &self.paths.stem,
            template: self.rst_template.as_deref(),
            output_files_dir: OUTPUT_FILES_DIR,
        };
        let export = self.services.exporter.export(&notebook, &request)?;

        let markup = self.paths.markup();
        write_export(fs, &markup, &self.paths.output_files_dir(), &export)?;
        Ok(markup)
    }

    /// Write the cloud-compatible copy: the first source cell, the template
    /// cells, then the remaining source cells.
    ///
    /// Reads the unexecuted source, so call this before [`execute`] when
    /// overwriting if the preamble should not carry outputs.
    /// Returns `None` (with a warning) when no template is configured.
    ///
    /// [`execute`]: NotebookConverter::execute
    pub fn append(&self) -> Result<Option<PathBuf>> {
        let Some(template_path) = &self.colab_template else {
            tracing::warn!("No colab template specified, skipping this step");
            return Ok(None);
        };

        let fs = self.services.fs;
        let template = Notebook::read_from(fs, template_path)?;
        let mut cloud = Notebook::read_from(fs, &self.paths.source)?;

        let mut source_cells = std::mem::take(&mut cloud.cells).into_iter();
        cloud.cells.extend(source_cells.next());
        cloud.cells.extend(template.cells);
        cloud.cells.extend(source_cells);

        cloud
            .metadata
            .insert("nbsphinx".to_string(), json!({ "execute": "never" }));

        cloud.write_to(fs, &self.paths.cloud)?;
        tracing::info!("Wrote colab notebook {}", self.paths.cloud.display());

        Ok(Some(self.paths.cloud.clone()))
    }

    /// Write the `.nblink` descriptor pointing at the source notebook.
    pub fn link(&self) -> Result<PathBuf> {
        let fs = self.services.fs;
        create_dir(fs, &self.paths.links_dir)?;

        let descriptor = LinkDescriptor {
            path: self
                .paths
                .source_relative_to_links()
                .to_string_lossy()
                .into_owned(),
        };
        let json = serde_json::to_string(&descriptor)?;
        fs.write(&self.paths.link, json.as_bytes())
            .map_err(|e| Error::Write {
                path: self.paths.link.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!("Linked {} -> {}", self.paths.link.display(), descriptor.path);
        Ok(self.paths.link.clone())
    }

    /// Blank the executed notebook: drop the execution flag and all outputs.
    ///
    /// Returns `false` (with a warning) when there is nothing to clean.
    pub fn unexecute(&self) -> Result<bool> {
        let fs = self.services.fs;
        tracing::info!(
            "Cleaning up notebook {} in {}",
            self.paths.file_name,
            self.paths.notebook_dir.display()
        );

        if !fs.exists(&self.paths.executed) {
            tracing::warn!(
                "{} not found, nothing to clean",
                self.paths.executed.display()
            );
            return Ok(false);
        }

        let mut notebook = Notebook::read_from(fs, &self.paths.executed)?;
        notebook.clear_execution_state();
        notebook.clear_outputs();
        notebook.write_to(fs, &self.paths.executed)?;

        Ok(true)
    }
}

fn create_dir(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    fs.create_dir_all(path).map_err(|e| Error::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub(crate) fn remove(fs: &dyn FileSystem, path: &Path) -> Result<()> {
    fs.remove_file(path).map_err(|e| Error::Delete {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Read a `.nblink` descriptor's target path.
pub fn read_link(fs: &dyn FileSystem, link: &Path) -> Result<String> {
    let content = fs.read_to_string(link).map_err(|e| Error::Read {
        path: link.to_path_buf(),
        message: e.to_string(),
    })?;
    let value: Value = serde_json::from_str(&content)?;
    value
        .get("path")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| Error::InvalidNotebook(format!("{} has no path", link.display())))
}
