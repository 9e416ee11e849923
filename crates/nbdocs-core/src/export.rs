//! Markup (reStructuredText) export.
//!
//! An exporter renders an executed notebook into text plus a map of side
//! artifacts (rendered plots and the like). [`write_export`] lays the result
//! out on disk:
//!
//! ```text
//! <output_dir>/<stem>.rst
//! <output_dir>/nboutput/<resource>
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::execute::JupyterToolchain;
use crate::fs::FileSystem;
use crate::notebook::Notebook;
use crate::paths::MARKUP_EXTENSION;

/// What to export and how.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    /// Key prefixed to resource names so notebooks sharing an output
    /// directory do not collide. The notebook stem.
    pub unique_key: &'a str,

    /// Template overriding the exporter's default.
    pub template: Option<&'a Path>,

    /// Subdirectory the body references resources from.
    pub output_files_dir: &'a str,
}

/// Rendered markup and its side artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Export {
    /// The markup text
    pub body: String,

    /// Resource file name -> contents
    pub resources: BTreeMap<String, Vec<u8>>,
}

/// Renders notebooks into markup.
pub trait MarkupExporter {
    /// Render `notebook`.
    fn export(&self, notebook: &Notebook, request: &ExportRequest<'_>) -> Result<Export>;
}

/// Write an export to `markup_path`, with its resources in `resource_dir`.
pub fn write_export(
    fs: &dyn FileSystem,
    markup_path: &Path,
    resource_dir: &Path,
    export: &Export,
) -> Result<()> {
    if !export.resources.is_empty() {
        fs.create_dir_all(resource_dir)
            .map_err(|e| Error::Write {
                path: resource_dir.to_path_buf(),
                message: e.to_string(),
            })?;

        for (name, contents) in &export.resources {
            let path = resource_dir.join(name);
            fs.write(&path, contents).map_err(|e| Error::Write {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }
    }

    fs.write(markup_path, export.body.as_bytes())
        .map_err(|e| Error::Write {
            path: markup_path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::debug!(
        "Wrote {} ({} resources)",
        markup_path.display(),
        export.resources.len()
    );

    Ok(())
}

/// Exports through `jupyter nbconvert --to rst`.
///
/// nbconvert runs in a scratch directory; the rendered file and its
/// resources are read back into memory and the scratch directory removed.
#[derive(Debug, Clone)]
pub struct NbconvertRstExporter {
    toolchain: JupyterToolchain,
}

impl NbconvertRstExporter {
    /// Create an exporter using the given toolchain.
    pub fn new(toolchain: JupyterToolchain) -> Self {
        Self { toolchain }
    }
}

impl MarkupExporter for NbconvertRstExporter {
    fn export(&self, notebook: &Notebook, request: &ExportRequest<'_>) -> Result<Export> {
        let scratch = tempfile::TempDir::new()?;
        let input = scratch
            .path()
            .join(format!("{}.ipynb", request.unique_key));
        let out_dir = scratch.path().join("out");
        fs::create_dir_all(&out_dir)?;
        fs::write(&input, notebook.to_json()?)?;

        let mut cmd = self.toolchain.nbconvert();
        cmd.args(["--to", "rst"])
            .arg("--output-dir")
            .arg(&out_dir)
            .arg(format!(
                "--NbConvertApp.output_files_dir={}",
                request.output_files_dir
            ));
        if let Some(template) = request.template {
            cmd.arg("--template-file").arg(template);
        }
        cmd.arg(&input);

        let output = cmd
            .output()
            .map_err(|e| Error::Engine(format!("Failed to run jupyter: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Export(stderr.trim().to_string()));
        }

        let body_path = out_dir.join(format!("{}.{}", request.unique_key, MARKUP_EXTENSION));
        let body = fs::read_to_string(&body_path).map_err(|e| Error::Read {
            path: body_path.clone(),
            message: e.to_string(),
        })?;

        let mut resources = BTreeMap::new();
        let resource_dir = out_dir.join(request.output_files_dir);
        if resource_dir.is_dir() {
            for entry in fs::read_dir(&resource_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    resources.insert(name, fs::read(entry.path())?);
                }
            }
        }

        Ok(Export { body, resources })
    }
}
