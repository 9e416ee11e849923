//! nbdocs CLI - execute, convert and clean notebooks for documentation builds.

mod colors;
mod config;
mod run;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigFile, Settings, load_config};

#[derive(Parser, Debug)]
#[command(name = "nbdocs")]
#[command(about = "Execute, convert and clean notebooks for documentation builds")]
#[command(version)]
pub struct Cli {
    /// Notebook, gallery script or directory to process
    pub path: PathBuf,

    /// Do not execute notebooks
    #[arg(long)]
    pub no_execute: bool,

    /// Re-execute notebooks already marked as executed
    #[arg(long)]
    pub force: bool,

    /// Write .nblink descriptors for each notebook
    #[arg(long)]
    pub link: bool,

    /// Delete generated files; blank notebooks when combined with --no-execute
    #[arg(long)]
    pub cleanup: bool,

    /// Only process files whose name matches this regex
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Export executed notebooks to reStructuredText
    #[arg(long)]
    pub rst: bool,

    /// Write a colab_ copy with the colab template cells
    #[arg(long)]
    pub colab: bool,

    /// Directory for executed, colab and RST files
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// nbconvert template for RST export
    #[arg(long, value_name = "FILE")]
    pub rst_template: Option<PathBuf>,

    /// Notebook whose cells are inserted into colab copies
    #[arg(long, value_name = "FILE")]
    pub colab_template: Option<PathBuf>,

    /// Write executed_ copies instead of executing in place
    #[arg(long)]
    pub no_overwrite: bool,

    /// Kernel to execute with (default: python3)
    #[arg(long, value_name = "NAME")]
    pub kernel: Option<String>,

    /// Per-cell timeout in seconds (default: 900)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep executing after a failing cell
    #[arg(long)]
    pub allow_errors: bool,

    /// Directory receiving .nblink descriptors
    #[arg(long, value_name = "DIR")]
    pub links_dir: Option<PathBuf>,

    /// YAML config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Helper to format nbdocs-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<nbdocs_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    let file = match &cli.config {
        Some(path) => load_config(path)?,
        None => ConfigFile::default(),
    };
    let settings = Settings::resolve(&cli, file)?;

    run::execute(&cli.path, &settings).map_err(format_error)?;

    Ok(())
}
