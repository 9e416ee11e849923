//! Locating the Jupyter toolchain.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// Environment variable overriding the `jupyter` executable.
pub const JUPYTER_ENV: &str = "NBDOCS_JUPYTER";

/// The `jupyter` executable used for execution and export.
#[derive(Debug, Clone)]
pub struct JupyterToolchain {
    /// Path to jupyter
    jupyter_path: PathBuf,
}

impl JupyterToolchain {
    /// Detect jupyter, preferring `$NBDOCS_JUPYTER` over `PATH`.
    pub fn new() -> Result<Self> {
        if let Some(path) = std::env::var_os(JUPYTER_ENV) {
            return Ok(Self::with_path(path));
        }

        let jupyter_path = which::which("jupyter")
            .map_err(|_| Error::Engine("jupyter not found in PATH".to_string()))?;
        Ok(Self { jupyter_path })
    }

    /// Use a specific executable.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            jupyter_path: path.into(),
        }
    }

    /// Get the jupyter path.
    pub fn jupyter_path(&self) -> &Path {
        &self.jupyter_path
    }

    /// A `jupyter nbconvert` command, ready for further arguments.
    pub fn nbconvert(&self) -> Command {
        let mut cmd = Command::new(&self.jupyter_path);
        cmd.arg("nbconvert");
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nbconvert_command_shape() {
        let toolchain = JupyterToolchain::with_path("/opt/conda/bin/jupyter");
        let cmd = toolchain.nbconvert();

        assert_eq!(cmd.get_program(), "/opt/conda/bin/jupyter");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["nbconvert"]);
    }
}
