//! Notebook generation from parsed gallery scripts.
//!
//! Text blocks become markdown cells (with a light reStructuredText to
//! markdown pass), code blocks become unexecuted code cells.

use serde_json::json;

use nbdocs_core::{Cell, CellType, Notebook};

use crate::parser::{BlockKind, ParsedScript};

const MAYAVI_IMPORT: &str = "from mayavi import mlab";
const MAYAVI_INIT: &str = "mlab.init_notebook()";
/// Matches the call with any backend argument.
const MAYAVI_INIT_CALL: &str = "mlab.init_notebook(";

/// Builds notebooks from parsed scripts.
#[derive(Debug, Clone)]
pub struct NotebookGenerator {
    /// Insert `mlab.init_notebook()` after a mayavi import so figures
    /// render inline.
    pub mayavi_init: bool,
}

impl NotebookGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self { mayavi_init: true }
    }

    /// Generate a Python 3 notebook.
    pub fn generate(&self, script: &ParsedScript) -> Notebook {
        let mut notebook = Notebook::new();
        notebook.metadata.insert(
            "kernelspec".to_string(),
            json!({
                "display_name": "Python 3",
                "language": "python",
                "name": "python3",
            }),
        );
        notebook.metadata.insert(
            "language_info".to_string(),
            json!({
                "file_extension": ".py",
                "mimetype": "text/x-python",
                "name": "python",
            }),
        );

        let mut markdown = RstToMarkdown::default();
        for block in &script.blocks {
            let cell = match block.kind {
                BlockKind::Text => Cell::markdown(&markdown.convert(&block.content)),
                BlockKind::Code => Cell::code(&block.content),
            };
            notebook.cells.push(cell);
        }

        if self.mayavi_init {
            init_mayavi(&mut notebook);
        }

        notebook
    }
}

impl Default for NotebookGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Add the mayavi notebook backend call to the first code cell.
///
/// Returns whether the cell was changed.
pub fn init_mayavi(notebook: &mut Notebook) -> bool {
    let Some(cell) = notebook
        .cells
        .iter_mut()
        .find(|c| c.cell_type == CellType::Code)
    else {
        return false;
    };

    let code = cell.source.text();
    if !code.contains(MAYAVI_IMPORT) || code.contains(MAYAVI_INIT_CALL) {
        return false;
    }

    let patched = code.replacen(
        MAYAVI_IMPORT,
        &format!("{}\n{}", MAYAVI_IMPORT, MAYAVI_INIT),
        1,
    );
    cell.source = nbdocs_core::Source::from_text(&patched);
    tracing::debug!("Added {} to the first code cell", MAYAVI_INIT);
    true
}

/// Convert the reStructuredText constructs gallery docstrings commonly use:
/// section titles and inline literals.
pub fn rst_to_markdown(text: &str) -> String {
    RstToMarkdown::default().convert(text)
}

/// Stateful converter; heading levels carry over between calls.
///
/// Levels follow the order in which underline characters first appear, as
/// in reStructuredText itself.
#[derive(Debug, Default)]
struct RstToMarkdown {
    levels: Vec<char>,
}

impl RstToMarkdown {
    fn convert(&mut self, text: &str) -> String {
        let lines: Vec<&str> = text.lines().collect();
        let mut out: Vec<String> = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            // Overlined title: rule, title, rule.
            if let Some(ch) = rule_char(line) {
                if i + 2 < lines.len()
                    && rule_char(lines[i + 2]) == Some(ch)
                    && !lines[i + 1].trim().is_empty()
                {
                    out.push(heading(self.level(ch), lines[i + 1].trim()));
                    i += 3;
                    continue;
                }
            }

            // Underlined title.
            if i + 1 < lines.len() && !line.trim().is_empty() && rule_char(line).is_none() {
                if let Some(ch) = rule_char(lines[i + 1]) {
                    if lines[i + 1].trim().len() >= line.trim().len() {
                        out.push(heading(self.level(ch), line.trim()));
                        i += 2;
                        continue;
                    }
                }
            }

            out.push(line.replace("``", "`"));
            i += 1;
        }

        out.join("\n")
    }

    fn level(&mut self, ch: char) -> usize {
        match self.levels.iter().position(|&c| c == ch) {
            Some(index) => index + 1,
            None => {
                self.levels.push(ch);
                self.levels.len()
            }
        }
    }
}

fn rule_char(line: &str) -> Option<char> {
    let trimmed = line.trim();
    let first = trimmed.chars().next()?;
    let is_rule = trimmed.len() >= 3
        && matches!(first, '=' | '-' | '~' | '^' | '*' | '+' | '#' | '"')
        && trimmed.chars().all(|c| c == first);
    is_rule.then_some(first)
}

fn heading(level: usize, title: &str) -> String {
    format!("{} {}", "#".repeat(level.min(6)), title.replace("``", "`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ScriptParser;

    fn generate(source: &str) -> Notebook {
        let script = ScriptParser::new().parse_source(source).unwrap();
        NotebookGenerator::new().generate(&script)
    }

    #[test]
    fn test_cells_follow_blocks() {
        let nb = generate("\"\"\"\nTitle\n=====\n\"\"\"\nx = 1\n# %%\n# More\ny = 2\n");

        let types: Vec<CellType> = nb.cells.iter().map(|c| c.cell_type).collect();
        assert_eq!(
            types,
            vec![CellType::Markdown, CellType::Code, CellType::Markdown, CellType::Code]
        );
        assert_eq!(nb.cells[0].source.text(), "# Title");
        assert_eq!(nb.cells[1].source.text(), "x = 1");
        assert!(!nb.cells[1].has_outputs());
        assert_eq!(nb.metadata["kernelspec"]["name"], "python3");
        assert_eq!((nb.nbformat, nb.nbformat_minor), (4, 4));
    }

    #[test]
    fn test_mayavi_init_inserted() {
        let nb = generate("\"\"\"Doc\"\"\"\nfrom mayavi import mlab\nmlab.test_plot3d()\n");
        assert_eq!(
            nb.cells[1].source.text(),
            "from mayavi import mlab\nmlab.init_notebook()\nmlab.test_plot3d()"
        );
    }

    #[test]
    fn test_mayavi_init_not_duplicated() {
        let source = "\"\"\"Doc\"\"\"\nfrom mayavi import mlab\nmlab.init_notebook()\n";
        let nb = generate(source);
        assert_eq!(nb.cells[1].source.text().matches(MAYAVI_INIT).count(), 1);
    }

    #[test]
    fn test_mayavi_init_with_arguments_is_kept() {
        let source = "\"\"\"Doc\"\"\"\nfrom mayavi import mlab\nmlab.init_notebook('png')\n";
        let nb = generate(source);
        assert_eq!(
            nb.cells[1].source.text(),
            "from mayavi import mlab\nmlab.init_notebook('png')"
        );
    }

    #[test]
    fn test_mayavi_only_first_code_cell() {
        let nb = generate("\"\"\"Doc\"\"\"\nimport os\n# %%\n# Later\nfrom mayavi import mlab\n");
        assert!(!nb.cells[3].source.text().contains(MAYAVI_INIT));
    }

    #[test]
    fn test_mayavi_rule_can_be_disabled() {
        let script = ScriptParser::new()
            .parse_source("\"\"\"Doc\"\"\"\nfrom mayavi import mlab\n")
            .unwrap();
        let generator = NotebookGenerator { mayavi_init: false };
        let nb = generator.generate(&script);
        assert!(!nb.cells[1].source.text().contains(MAYAVI_INIT));
    }

    #[test]
    fn test_rst_headings_and_literals() {
        let rst = "=====\nTitle\n=====\n\nUses ``numpy``.\n\nSection\n-------\n\nMore\n====";
        assert_eq!(
            rst_to_markdown(rst),
            "# Title\n\nUses `numpy`.\n\n## Section\n\n# More"
        );
    }

    #[test]
    fn test_heading_levels_span_cells() {
        let nb = generate("\"\"\"\nTitle\n=====\n\"\"\"\nx = 1\n# %%\n# Part\n# ----\ny = 2\n");
        assert_eq!(nb.cells[2].source.text(), "## Part");
    }

    #[test]
    fn test_short_rule_is_not_a_heading() {
        assert_eq!(rst_to_markdown("A long title\n---"), "A long title\n---");
    }
}
