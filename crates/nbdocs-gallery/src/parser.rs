//! Parser for gallery-style Python scripts.
//!
//! A gallery script opens with a module docstring and alternates code with
//! comment blocks:
//!
//! ```text
//! """
//! Plotting a sine
//! ===============
//! """                        ──► text block
//! import numpy as np         ──► code block
//!
//! # %%                       ──► separator
//! # Now plot it.             ──► text block
//! plt.plot(np.sin(x))        ──► code block
//! ```
//!
//! Lines of twenty or more `#` work as separators too. Configuration
//! comments (`# sphinx_gallery_<key> = <value>`) are dropped.

use crate::error::{GalleryError, GalleryResult};

const CONFIG_PREFIX: &str = "sphinx_gallery_";
const RULE_MIN_LEN: usize = 20;

/// Kind of block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// reStructuredText prose
    Text,
    /// Python source
    Code,
}

/// A contiguous run of text or code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,

    /// Content with comment markers stripped (text) or as written (code).
    pub content: String,

    /// 1-based line the block starts on.
    pub line: usize,
}

/// A parsed gallery script.
#[derive(Debug, Clone, Default)]
pub struct ParsedScript {
    /// Blocks in file order; the first is always the docstring.
    pub blocks: Vec<Block>,
}

impl ParsedScript {
    /// The docstring's first non-empty line.
    pub fn title(&self) -> Option<&str> {
        self.blocks
            .first()
            .and_then(|b| b.content.lines().map(str::trim).find(|l| !l.is_empty()))
    }
}

/// Parser for gallery scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptParser;

impl ScriptParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self
    }

    /// Whether `source` opens with a module docstring.
    pub fn is_literate(&self, source: &str) -> bool {
        docstring_start(source).is_some()
    }

    /// Split source into blocks.
    pub fn parse_source(&self, source: &str) -> GalleryResult<ParsedScript> {
        let (offset, first_line) = docstring_start(source).ok_or_else(|| {
            GalleryError::NotLiterate("script does not start with a docstring".to_string())
        })?;

        let (docstring, body, body_line) = split_docstring(&source[offset..], first_line)?;

        let mut script = ParsedScript::default();
        script.blocks.push(Block {
            kind: BlockKind::Text,
            content: docstring,
            line: first_line,
        });

        let mut lines = body
            .lines()
            .enumerate()
            .map(|(i, l)| (i + body_line, l))
            .peekable();
        let mut code: Vec<(usize, &str)> = Vec::new();

        while let Some((number, line)) = lines.next() {
            if is_config_comment(line) {
                continue;
            }

            if !is_separator(line) {
                code.push((number, line));
                continue;
            }

            flush_code(&mut script.blocks, &mut code);

            let mut text = Vec::new();
            let mut start = number + 1;
            while let Some(&(next_number, next)) = lines.peek() {
                if !next.starts_with('#') || is_separator(next) {
                    break;
                }
                lines.next();
                if is_config_comment(next) {
                    continue;
                }
                if text.is_empty() {
                    start = next_number;
                }
                text.push(strip_comment(next));
            }

            while text.last().is_some_and(|l: &&str| l.trim().is_empty()) {
                text.pop();
            }
            if !text.is_empty() {
                script.blocks.push(Block {
                    kind: BlockKind::Text,
                    content: text.join("\n"),
                    line: start,
                });
            }
        }

        flush_code(&mut script.blocks, &mut code);

        tracing::debug!("Parsed gallery script: {} blocks", script.blocks.len());

        Ok(script)
    }
}

/// Byte offset and 1-based line of the opening docstring, if the script
/// starts with one. Blank lines and comments (shebang, encoding) may precede it.
fn docstring_start(source: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            offset += line.len();
            continue;
        }
        return opening_quote(trimmed).map(|_| (offset, index + 1));
    }
    None
}

/// Length of the string prefix plus quote, and the quote itself.
fn opening_quote(text: &str) -> Option<(usize, &'static str)> {
    let prefix = text
        .chars()
        .take_while(|c| matches!(c, 'r' | 'R' | 'u' | 'U'))
        .count();
    if prefix > 1 {
        return None;
    }
    let rest = &text[prefix..];
    ["\"\"\"", "'''"]
        .into_iter()
        .find(|quote| rest.starts_with(quote))
        .map(|quote| (prefix + quote.len(), quote))
}

/// Split at the closing quote: (dedented docstring, remaining source, line
/// the remainder starts on).
fn split_docstring(source: &str, first_line: usize) -> GalleryResult<(String, &str, usize)> {
    let leading = source.len() - source.trim_start().len();
    let text = &source[leading..];
    let (open_len, quote) =
        opening_quote(text).ok_or(GalleryError::UnterminatedDocstring { line: first_line })?;

    let inner = &text[open_len..];
    let close = inner
        .find(quote)
        .ok_or(GalleryError::UnterminatedDocstring { line: first_line })?;
    let docstring = &inner[..close];

    // Rest of the closing line is dropped.
    let after_quote = &inner[close + quote.len()..];
    let body = match after_quote.find('\n') {
        Some(newline) => &after_quote[newline + 1..],
        None => "",
    };
    let body_line = first_line + docstring.matches('\n').count() + 1;

    Ok((dedent(docstring), body, body_line))
}

/// Strip common indentation from all lines but the first, and surrounding
/// blank lines.
fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let dedented: Vec<&str> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim()
            } else if l.len() >= indent {
                l[indent..].trim_end()
            } else {
                l.trim()
            }
        })
        .collect();

    dedented.join("\n").trim_matches('\n').to_string()
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim_end();
    if trimmed.starts_with("# %%") || trimmed.starts_with("#%%") {
        return true;
    }
    trimmed.len() >= RULE_MIN_LEN && trimmed.chars().all(|c| c == '#')
}

fn is_config_comment(line: &str) -> bool {
    line.trim()
        .strip_prefix('#')
        .is_some_and(|rest| rest.trim_start().starts_with(CONFIG_PREFIX))
}

fn strip_comment(line: &str) -> &str {
    let rest = line.strip_prefix('#').unwrap_or(line);
    rest.strip_prefix(' ').unwrap_or(rest).trim_end()
}

fn flush_code(blocks: &mut Vec<Block>, code: &mut Vec<(usize, &str)>) {
    let lines = std::mem::take(code);
    let start = lines.iter().position(|(_, l)| !l.trim().is_empty());
    let end = lines.iter().rposition(|(_, l)| !l.trim().is_empty());
    if let (Some(start), Some(end)) = (start, end) {
        blocks.push(Block {
            kind: BlockKind::Code,
            content: lines[start..=end]
                .iter()
                .map(|(_, l)| *l)
                .collect::<Vec<_>>()
                .join("\n"),
            line: lines[start].0,
        });
    }
}
