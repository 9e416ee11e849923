//! Jupyter notebook (.ipynb) document model.
//!
//! Fields nbdocs does not interpret are carried through untouched, so a
//! read/write cycle only changes what the converter changes on purpose:
//! cell outputs and the `docs_executed` metadata flag.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Notebook metadata key recording the execution state.
pub const EXECUTED_KEY: &str = "docs_executed";

/// Cell metadata fields dropped when outputs are cleared.
const VIEW_METADATA_KEYS: [&str; 2] = ["collapsed", "scrolled"];

/// Lifecycle state stored under [`EXECUTED_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Every cell ran without error.
    Executed,
    /// A run was attempted and a cell failed.
    Errored,
}

impl ExecutionState {
    /// The value written into notebook metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Executed => "executed",
            ExecutionState::Errored => "errored",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "executed" => Some(ExecutionState::Executed),
            "errored" => Some(ExecutionState::Errored),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Jupyter notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    /// Notebook cells
    pub cells: Vec<Cell>,

    /// Notebook metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Format version
    pub nbformat: u32,

    /// Minor format version
    pub nbformat_minor: u32,

    /// Top-level fields we do not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Kind of cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
    Raw,
}

/// A notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Cell type
    pub cell_type: CellType,

    /// Execution count; present (possibly null) on code cells only
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_count: Option<Option<u64>>,

    /// Cell id (nbformat >= 4.5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Cell metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// Outputs; present on code cells only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<Value>>,

    /// Cell source
    pub source: Source,

    /// Cell fields we do not interpret (attachments, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Cell source: nbformat accepts a single string or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Source {
    Lines(Vec<String>),
    Text(String),
}

/// Distinguish a missing key (outer `None`) from an explicit `null`.
fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<u64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(Some)
}

impl Source {
    /// Split text into nbformat lines, each keeping its trailing newline.
    pub fn from_text(text: &str) -> Self {
        Source::Lines(text.split_inclusive('\n').map(String::from).collect())
    }

    /// The source joined into one string.
    pub fn text(&self) -> String {
        match self {
            Source::Lines(lines) => lines.concat(),
            Source::Text(text) => text.clone(),
        }
    }
}

impl Cell {
    /// A new markdown cell.
    pub fn markdown(text: &str) -> Self {
        Self {
            cell_type: CellType::Markdown,
            execution_count: None,
            id: None,
            metadata: Map::new(),
            outputs: None,
            source: Source::from_text(text),
            extra: Map::new(),
        }
    }

    /// A new, unexecuted code cell.
    pub fn code(text: &str) -> Self {
        Self {
            cell_type: CellType::Code,
            execution_count: Some(None),
            id: None,
            metadata: Map::new(),
            outputs: Some(Vec::new()),
            source: Source::from_text(text),
            extra: Map::new(),
        }
    }

    /// Whether this cell holds any output.
    pub fn has_outputs(&self) -> bool {
        self.outputs.as_ref().is_some_and(|o| !o.is_empty())
    }

    /// Remove outputs and execution count, as a fresh kernel would see it.
    pub fn clear_outputs(&mut self) {
        if self.cell_type != CellType::Code {
            return;
        }
        self.outputs = Some(Vec::new());
        self.execution_count = Some(None);
        for key in VIEW_METADATA_KEYS {
            self.metadata.remove(key);
        }
    }
}

impl Notebook {
    /// Create an empty nbformat 4.4 notebook.
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: 4,
            nbformat_minor: 4,
            extra: Map::new(),
        }
    }

    /// Parse a notebook from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let notebook: Self = serde_json::from_str(json)?;
        if notebook.nbformat < 4 {
            return Err(Error::InvalidNotebook(format!(
                "nbformat {} is not supported, upgrade the notebook to version 4",
                notebook.nbformat
            )));
        }
        Ok(notebook)
    }

    /// Serialize the way nbformat writes notebooks: one-space indent and a
    /// trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        buf.push(b'\n');
        String::from_utf8(buf).map_err(|e| Error::InvalidNotebook(e.to_string()))
    }

    /// Read a notebook from a file.
    pub fn read_from(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs.read_to_string(path).map_err(|e| Error::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| match e {
            Error::Json(err) => Error::InvalidNotebook(format!("{}: {}", path.display(), err)),
            other => other,
        })
    }

    /// Write the notebook to a file.
    pub fn write_to(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs.write(path, json.as_bytes()).map_err(|e| Error::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Clear outputs of every code cell.
    pub fn clear_outputs(&mut self) {
        for cell in &mut self.cells {
            cell.clear_outputs();
        }
    }

    /// Whether any cell holds output.
    pub fn has_outputs(&self) -> bool {
        self.cells.iter().any(Cell::has_outputs)
    }

    /// The recorded execution state. Unknown values read as never executed.
    pub fn execution_state(&self) -> Option<ExecutionState> {
        self.metadata
            .get(EXECUTED_KEY)
            .and_then(Value::as_str)
            .and_then(ExecutionState::parse)
    }

    /// Record an execution attempt.
    pub fn set_execution_state(&mut self, state: ExecutionState) {
        self.metadata
            .insert(EXECUTED_KEY.to_string(), Value::from(state.as_str()));
    }

    /// Forget any execution attempt. Returns whether a flag was present.
    pub fn clear_execution_state(&mut self) -> bool {
        self.metadata.remove(EXECUTED_KEY).is_some()
    }
}

impl Default for Notebook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "metadata": {},
   "source": ["# Title\n", "Intro"]
  },
  {
   "cell_type": "code",
   "execution_count": 3,
   "metadata": {"collapsed": false, "tags": ["keep"]},
   "outputs": [{"name": "stdout", "output_type": "stream", "text": ["42\n"]}],
   "source": "print(42)"
  }
 ],
 "metadata": {"kernelspec": {"name": "python3"}, "docs_executed": "executed"},
 "nbformat": 4,
 "nbformat_minor": 2,
 "custom": true
}"##;

    #[test]
    fn test_parse_preserves_unknown_fields() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        assert_eq!(nb.cells.len(), 2);
        assert_eq!(nb.extra.get("custom"), Some(&Value::Bool(true)));
        assert_eq!(nb.cells[0].source.text(), "# Title\nIntro");
        assert_eq!(nb.cells[1].source.text(), "print(42)");

        let json = nb.to_json().unwrap();
        assert!(json.contains("\"custom\": true"));
        assert!(json.contains("\"kernelspec\""));
        assert!(json.ends_with("}\n"));
    }

    #[test]
    fn test_markdown_cell_has_no_code_fields() {
        let nb = Notebook::from_json(SAMPLE).unwrap();
        let json = serde_json::to_value(&nb.cells[0]).unwrap();
        assert!(json.get("outputs").is_none());
        assert!(json.get("execution_count").is_none());
    }

    #[test]
    fn test_clear_outputs_keeps_null_execution_count() {
        let mut nb = Notebook::from_json(SAMPLE).unwrap();
        assert!(nb.has_outputs());

        nb.clear_outputs();
        assert!(!nb.has_outputs());

        let code = serde_json::to_value(&nb.cells[1]).unwrap();
        assert_eq!(code["execution_count"], Value::Null);
        assert_eq!(code["outputs"], serde_json::json!([]));
        assert!(code["metadata"].get("collapsed").is_none());
        assert_eq!(code["metadata"]["tags"], serde_json::json!(["keep"]));
    }

    #[test]
    fn test_execution_state_flag() {
        let mut nb = Notebook::from_json(SAMPLE).unwrap();
        assert_eq!(nb.execution_state(), Some(ExecutionState::Executed));

        nb.set_execution_state(ExecutionState::Errored);
        assert_eq!(nb.metadata[EXECUTED_KEY], "errored");

        assert!(nb.clear_execution_state());
        assert_eq!(nb.execution_state(), None);
        assert!(!nb.clear_execution_state());
    }

    #[test]
    fn test_unknown_state_value_reads_as_unexecuted() {
        let mut nb = Notebook::new();
        nb.metadata
            .insert(EXECUTED_KEY.to_string(), Value::from("pending"));
        assert_eq!(nb.execution_state(), None);
    }

    #[test]
    fn test_reject_old_nbformat() {
        let json = r#"{"cells": [], "metadata": {}, "nbformat": 3, "nbformat_minor": 0}"#;
        assert!(matches!(
            Notebook::from_json(json),
            Err(Error::InvalidNotebook(_))
        ));
    }

    #[test]
    fn test_source_from_text_splits_lines() {
        let source = Source::from_text("import os\nprint(os.sep)");
        assert_eq!(
            source,
            Source::Lines(vec!["import os\n".to_string(), "print(os.sep)".to_string()])
        );
        assert_eq!(source.text(), "import os\nprint(os.sep)");
    }
}
