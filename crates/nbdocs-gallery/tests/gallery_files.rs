//! Integration tests for gallery script conversion.
//!
//! Tests the full pipeline: .py on disk → .ipynb on disk → batch materialization.

use std::fs;
use std::path::Path;

use nbdocs_core::{CellType, Notebook, OsFileSystem, ScriptConverter};
use nbdocs_gallery::{GalleryConverter, default_notebook_path};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a temporary directory for test artifacts.
fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

fn mayavi_script() -> &'static str {
    r#"# -*- coding: utf-8 -*-
"""
Brain surface
=============

Rendered with ``mayavi``.
"""
# Author: Jane Doe
from mayavi import mlab
import numpy as np

###############################################################################
# Render
# ------
mlab.mesh(np.zeros((2, 2)), np.zeros((2, 2)), np.zeros((2, 2)))
mlab.show()
"#
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_convert_script_on_disk() {
    let dir = temp_dir();
    let script = dir.path().join("plot_brain.py");
    fs::write(&script, mayavi_script()).expect("write script");

    let path = GalleryConverter::new()
        .convert_file(&OsFileSystem, &script)
        .expect("convert");
    assert_eq!(path, dir.path().join("plot_brain.ipynb"));

    let json = fs::read_to_string(&path).expect("read notebook");
    let nb = Notebook::from_json(&json).expect("valid notebook");

    let types: Vec<CellType> = nb.cells.iter().map(|c| c.cell_type).collect();
    assert_eq!(
        types,
        vec![CellType::Markdown, CellType::Code, CellType::Markdown, CellType::Code]
    );
    assert_eq!(
        nb.cells[0].source.text(),
        "# Brain surface\n\nRendered with `mayavi`."
    );
    // comment directly after the docstring stays in the code
    assert_eq!(
        nb.cells[1].source.text(),
        "# Author: Jane Doe\nfrom mayavi import mlab\nmlab.init_notebook()\nimport numpy as np"
    );
    assert_eq!(nb.cells[2].source.text(), "## Render");
    assert!(nb.cells.iter().all(|c| !c.has_outputs()));
}

#[test]
fn test_convert_file_reports_missing_script() {
    let dir = temp_dir();
    let script = dir.path().join("missing.py");
    let result = GalleryConverter::new().convert_file(&OsFileSystem, &script);
    assert!(matches!(result, Err(nbdocs_core::Error::Read { path, .. }) if path == script));
    assert!(!dir.path().join("missing.ipynb").exists());
}

#[test]
fn test_materialized_notebook_serializes_like_jupyter() {
    let converter = GalleryConverter::new();
    let nb = converter
        .materialize("\"\"\"Title\"\"\"\nprint(1)\n")
        .expect("materialize");

    let json = nb.to_json().expect("serialize");
    assert!(json.starts_with("{\n \"cells\": ["));
    assert!(json.ends_with("}\n"));
    assert!(json.contains("\"execution_count\": null"));
    assert!(json.contains("\"outputs\": []"));
}

#[test]
fn test_derived_path_is_deterministic() {
    let converter = GalleryConverter::new();
    let script = Path::new("/docs/gallery/plot_sine.py");
    assert_eq!(
        converter.derived_notebook_path(script),
        default_notebook_path(script)
    );
    assert_eq!(
        converter.derived_notebook_path(script),
        converter.derived_notebook_path(script)
    );
}
