//! Batch processing of a notebook tree.
//!
//! ```text
//! walk_files(root) ──► classify(path) ──► plan(kind, options) ──► Action
//!                                                                   │
//!        ┌─────────────┬───────────────────┬────────────────────────┤
//!        ▼             ▼                   ▼                        ▼
//!      Skip         Delete         ProcessNotebook           ProcessScript
//!                                 link → append → execute    materialize via
//!                                 → convert → unexecute      ScriptConverter,
//!                                                            then as notebook
//! ```
//!
//! The file list is collected before any effect runs, so notebooks created
//! during a pass are not visited again in the same pass.
//!
//! # Module Structure
//!
//! - `classify` - pure path classification and action planning
//! - `manifest` - record of script-derived notebooks

mod classify;
mod manifest;

pub use classify::{Action, FileKind, NameFilter, classify, plan};
pub use manifest::{DerivationManifest, MANIFEST_FILE};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::ConverterConfig;
use crate::converter::{ExecuteOutcome, NotebookConverter, Services, remove};
use crate::error::{Error, Result};
use crate::paths::SCRIPT_EXTENSION;

/// Which steps a batch run performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Execute notebooks.
    pub execute: bool,
    /// Re-execute notebooks already marked executed.
    pub force: bool,
    /// Write `.nblink` descriptors.
    pub link: bool,
    /// Delete generated files; blank notebooks when not executing.
    pub cleanup: bool,
    /// Regex selecting notebook and script file names.
    pub name_filter: String,
    /// Export executed notebooks to RST.
    pub rst: bool,
    /// Write cloud-compatible copies.
    pub colab: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            execute: true,
            force: false,
            link: false,
            cleanup: false,
            name_filter: String::new(),
            rst: false,
            colab: false,
        }
    }
}

/// Counts of what a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    pub executed: usize,
    pub errored: usize,
    pub up_to_date: usize,
    pub unexecuted: usize,
    pub converted: usize,
    pub cloud_copies: usize,
    pub linked: usize,
    pub materialized: usize,
    pub deleted: usize,
    pub skipped: usize,
    /// Notebooks whose execution failed.
    pub failures: Vec<PathBuf>,
}

/// Process a notebook, a literate script, or a whole directory tree.
///
/// Cell failures are recorded in the affected notebook and the run goes on;
/// any other error stops the run.
pub fn process(
    path: &Path,
    options: &ProcessOptions,
    config: &ConverterConfig,
    services: Services<'_>,
) -> Result<ProcessReport> {
    let path = std::path::absolute(path)?;
    if !services.fs.exists(&path) {
        return Err(Error::Read {
            path,
            message: "no such file or directory".to_string(),
        });
    }

    let mut batch = Batch {
        options,
        config,
        services,
        filter: NameFilter::new(&options.name_filter)?,
        report: ProcessReport::default(),
        removed: HashSet::new(),
    };

    if services.fs.is_dir(&path) {
        batch.walk(&path)?;
    } else {
        batch.single(&path)?;
    }

    Ok(batch.report)
}

struct Batch<'a> {
    options: &'a ProcessOptions,
    config: &'a ConverterConfig,
    services: Services<'a>,
    filter: NameFilter,
    report: ProcessReport,
    /// Files deleted earlier in this pass.
    removed: HashSet<PathBuf>,
}

impl Batch<'_> {
    fn walk(&mut self, root: &Path) -> Result<()> {
        let fs = self.services.fs;
        let files = fs.walk_files(root)?;
        tracing::debug!("Found {} files under {}", files.len(), root.display());

        for file in files {
            if self.removed.contains(&file) || !fs.exists(&file) {
                continue;
            }

            let relative = file.strip_prefix(root).unwrap_or(file.as_path());
            let kind = classify(relative);
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match plan(kind, &file_name, self.options, &self.filter) {
                Action::Skip => {
                    tracing::debug!("Skipping {} ({:?})", relative.display(), kind);
                    self.report.skipped += 1;
                }
                Action::Delete => self.delete(&file)?,
                Action::ProcessNotebook => self.notebook(&file)?,
                Action::ProcessScript => self.script(&file)?,
            }
        }

        Ok(())
    }

    /// An explicitly named file bypasses classification and the name filter.
    fn single(&mut self, path: &Path) -> Result<()> {
        let is_script = path
            .extension()
            .is_some_and(|e| e == SCRIPT_EXTENSION);
        if is_script {
            self.script(path)
        } else {
            self.notebook(path)
        }
    }

    fn delete(&mut self, path: &Path) -> Result<()> {
        tracing::info!("Removing {}", path.display());
        remove(self.services.fs, path)?;
        self.removed.insert(path.to_path_buf());
        self.report.deleted += 1;
        Ok(())
    }

    fn notebook(&mut self, path: &Path) -> Result<()> {
        let converter = NotebookConverter::new(path, self.config, self.services)?;

        if self.options.link {
            converter.link()?;
            self.report.linked += 1;
        }

        if self.options.colab && converter.append()?.is_some() {
            self.report.cloud_copies += 1;
        }

        if self.options.execute {
            let result = converter.execute(self.options.force)?;
            match result.outcome {
                ExecuteOutcome::Executed => self.report.executed += 1,
                ExecuteOutcome::Skipped => self.report.up_to_date += 1,
                ExecuteOutcome::Errored => {
                    self.report.errored += 1;
                    self.report.failures.push(path.to_path_buf());
                }
            }
        }

        if self.options.rst {
            converter.convert()?;
            self.report.converted += 1;
        }

        if self.options.cleanup && !self.options.execute && converter.unexecute()? {
            self.report.unexecuted += 1;
        }

        Ok(())
    }

    /// The derivation record is saved as soon as it changes, so it survives
    /// an error later in the run.
    fn script(&mut self, script: &Path) -> Result<()> {
        let fs = self.services.fs;
        let derived = self.services.scripts.derived_notebook_path(script);

        if fs.exists(&derived) {
            if self.options.execute {
                // Visited as a notebook in its own right.
                tracing::debug!(
                    "{} already materialized as {}",
                    script.display(),
                    derived.display()
                );
                return Ok(());
            }
            if self.options.cleanup {
                let mut manifest = DerivationManifest::for_script(fs, script)?;
                if manifest.is_derived(script, &derived) {
                    self.delete(&derived)?;
                    manifest.forget(script);
                    manifest.save(fs)?;
                } else {
                    tracing::warn!(
                        "{} was not generated from {}, leaving it in place",
                        derived.display(),
                        script.display()
                    );
                }
            }
            return Ok(());
        }

        let wants_notebook =
            self.options.execute || self.options.link || self.options.rst || self.options.colab;
        if !wants_notebook {
            return Ok(());
        }

        let source = fs.read_to_string(script).map_err(|e| Error::Read {
            path: script.to_path_buf(),
            message: e.to_string(),
        })?;
        if !self.services.scripts.is_literate(&source) {
            tracing::warn!(
                "{} does not start with a docstring, not a gallery script",
                script.display()
            );
            return Ok(());
        }

        tracing::info!("Converting {} to {}", script.display(), derived.display());
        let notebook = self.services.scripts.materialize(&source)?;
        notebook.write_to(fs, &derived)?;
        let mut manifest = DerivationManifest::for_script(fs, script)?;
        manifest.record(script, &derived);
        manifest.save(fs)?;
        self.report.materialized += 1;

        self.notebook(&derived)
    }
}
