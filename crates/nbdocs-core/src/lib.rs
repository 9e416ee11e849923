//! Core engine for nbdocs, the notebook documentation builder.
//!
//! This crate provides:
//! - Lossless notebook model with the `docs_executed` state flag
//! - Per-notebook execute, convert, append, link and unexecute operations
//! - Batch walker classifying a documentation tree into actions
//! - Jupyter-backed execution and RST export engines
//! - Filesystem abstraction with an in-memory implementation

pub mod batch;
pub mod config;
pub mod converter;
pub mod error;
pub mod execute;
pub mod export;
pub mod fs;
pub mod notebook;
pub mod paths;
pub mod script;

#[cfg(test)]
mod test_support;

pub use batch::{
    Action, DerivationManifest, FileKind, NameFilter, ProcessOptions, ProcessReport, classify,
    plan, process,
};
pub use config::ConverterConfig;
pub use converter::{
    ExecuteOutcome, ExecutedNotebook, LinkDescriptor, NotebookConverter, Services, read_link,
};
pub use error::{Error, Result};
pub use execute::{
    ExecutionError, ExecutionOptions, JupyterExecutor, JupyterToolchain, NotebookExecutor,
};
pub use export::{Export, ExportRequest, MarkupExporter, NbconvertRstExporter};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use notebook::{Cell, CellType, ExecutionState, Notebook, Source};
pub use paths::NotebookPaths;
pub use script::ScriptConverter;
