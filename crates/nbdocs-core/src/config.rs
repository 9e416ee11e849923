//! Converter configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::execute::{DEFAULT_KERNEL, DEFAULT_TIMEOUT, ExecutionOptions};
use crate::paths::DEFAULT_LINKS_DIR;

/// How each notebook is converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Directory for executed, cloud and markup files. Defaults to the
    /// notebook's own directory.
    pub output_dir: Option<PathBuf>,

    /// Template overriding the exporter's default RST template.
    pub rst_template: Option<PathBuf>,

    /// Notebook whose cells make up the cloud-compatibility preamble.
    pub colab_template: Option<PathBuf>,

    /// Execute in place (true) or into an `executed_` copy (false).
    pub overwrite: bool,

    /// Kernel name.
    pub kernel: Option<String>,

    /// Per-cell timeout.
    pub timeout: Duration,

    /// Keep running after a failing cell.
    pub allow_errors: bool,

    /// Directory receiving `.nblink` descriptors.
    pub links_dir: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            rst_template: None,
            colab_template: None,
            overwrite: true,
            kernel: None,
            timeout: DEFAULT_TIMEOUT,
            allow_errors: false,
            links_dir: PathBuf::from(DEFAULT_LINKS_DIR),
        }
    }
}

impl ConverterConfig {
    /// Settings for the execution engine.
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            timeout: self.timeout,
            kernel: self
                .kernel
                .clone()
                .unwrap_or_else(|| DEFAULT_KERNEL.to_string()),
            allow_errors: self.allow_errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_falls_back_to_python3() {
        let config = ConverterConfig::default();
        assert!(config.overwrite);
        assert_eq!(config.execution_options().kernel, "python3");

        let config = ConverterConfig {
            kernel: Some("julia-1.10".to_string()),
            ..Default::default()
        };
        assert_eq!(config.execution_options().kernel, "julia-1.10");
    }
}
