//! YAML configuration file and its merge with command-line flags.
//!
//! ```yaml
//! output_dir: build/notebooks
//! rst_template: docs/templates/nb.tpl
//! colab_template: docs/templates/colab.ipynb
//! overwrite: true
//! kernel: python3
//! timeout_secs: 600
//! allow_errors: false
//! links_dir: docs/notebooks_external
//! name_filter: "^plot_"
//! ```
//!
//! Every key is optional. Flags given on the command line win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use nbdocs_core::{ConverterConfig, NameFilter, ProcessOptions};

use crate::Cli;

/// Config file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Contents of a `--config` file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub output_dir: Option<PathBuf>,
    pub rst_template: Option<PathBuf>,
    pub colab_template: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub kernel: Option<String>,
    pub timeout_secs: Option<u64>,
    pub allow_errors: Option<bool>,
    pub links_dir: Option<PathBuf>,
    pub name_filter: Option<String>,
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<ConfigFile, ConfigError> {
    // An empty file deserializes to unit, not to a mapping.
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Everything a run needs, after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub converter: ConverterConfig,
    pub options: ProcessOptions,
}

impl Settings {
    /// Merge `file` under the command-line flags and validate the result.
    pub fn resolve(cli: &Cli, file: ConfigFile) -> Result<Self, ConfigError> {
        let defaults = ConverterConfig::default();

        let timeout_secs = cli
            .timeout
            .or(file.timeout_secs)
            .unwrap_or(defaults.timeout.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }

        let converter = ConverterConfig {
            output_dir: cli.output.clone().or(file.output_dir),
            rst_template: cli.rst_template.clone().or(file.rst_template),
            colab_template: cli.colab_template.clone().or(file.colab_template),
            overwrite: !cli.no_overwrite && file.overwrite.unwrap_or(defaults.overwrite),
            kernel: cli.kernel.clone().or(file.kernel),
            timeout: Duration::from_secs(timeout_secs),
            allow_errors: cli.allow_errors || file.allow_errors.unwrap_or(defaults.allow_errors),
            links_dir: cli
                .links_dir
                .clone()
                .or(file.links_dir)
                .unwrap_or(defaults.links_dir),
        };

        let name_filter = cli
            .filter
            .clone()
            .or(file.name_filter)
            .unwrap_or_default();
        NameFilter::new(&name_filter)
            .map_err(|e| ConfigError::InvalidConfig(format!("name filter: {}", e)))?;

        let options = ProcessOptions {
            execute: !cli.no_execute,
            force: cli.force,
            link: cli.link,
            cleanup: cli.cleanup,
            name_filter,
            rst: cli.rst,
            colab: cli.colab,
        };

        Ok(Self { converter, options })
    }

    /// Whether this run will call into Jupyter.
    pub fn needs_jupyter(&self) -> bool {
        self.options.execute || self.options.rst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["nbdocs"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_parse_config_file() {
        let file = parse_config(
            "output_dir: build\nkernel: ir\ntimeout_secs: 60\nname_filter: \"^plot_\"\n",
        )
        .unwrap();
        assert_eq!(file.output_dir, Some(PathBuf::from("build")));
        assert_eq!(file.kernel.as_deref(), Some("ir"));
        assert_eq!(file.timeout_secs, Some(60));
    }

    #[test]
    fn test_empty_config_file() {
        assert_eq!(parse_config("\n").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(matches!(
            parse_config("outptu_dir: build\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_flags_override_file() {
        let file = ConfigFile {
            kernel: Some("ir".to_string()),
            timeout_secs: Some(60),
            name_filter: Some("^plot_".to_string()),
            overwrite: Some(true),
            ..Default::default()
        };
        let settings =
            Settings::resolve(&cli(&["docs", "--kernel", "python3", "--no-overwrite"]), file)
                .unwrap();

        assert_eq!(settings.converter.kernel.as_deref(), Some("python3"));
        assert_eq!(settings.converter.timeout, Duration::from_secs(60));
        assert!(!settings.converter.overwrite);
        assert_eq!(settings.options.name_filter, "^plot_");
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&cli(&["docs"]), ConfigFile::default()).unwrap();
        assert_eq!(settings.converter, ConverterConfig::default());
        assert_eq!(settings.options, ProcessOptions::default());
        assert!(settings.needs_jupyter());
    }

    #[test]
    fn test_cleanup_only_does_not_need_jupyter() {
        let settings =
            Settings::resolve(&cli(&["docs", "--no-execute", "--cleanup"]), ConfigFile::default())
                .unwrap();
        assert!(!settings.needs_jupyter());
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Settings::resolve(&cli(&["docs", "--timeout", "0"]), ConfigFile::default()),
            Err(ConfigError::InvalidConfig(_))
        ));
        assert!(matches!(
            Settings::resolve(&cli(&["docs", "--filter", "("]), ConfigFile::default()),
            Err(ConfigError::InvalidConfig(_))
        ));
    }
}
