//! HTML to markdown conversion.
//!
//! Journal content is mostly HTML produced by Foundry's rich text editor. The
//! pipeline only depends on the [`HtmlRenderer`] contract: a pure function from
//! HTML to markdown that may fail. [`HtmdRenderer`] is the default, built on
//! [htmd](https://docs.rs/htmd).
//!
//! The renderer escapes literal brackets, so `@JournalEntry[id]{label}` in the
//! HTML comes out as `@JournalEntry\[id\]{label}`. The reference rewriter
//! accepts both forms.
//!
//! Tables become GFM pipe tables. The first row is the header row whether or
//! not it uses `<th>`, and short rows are padded to the widest one:
//!
//! ```text
//! <table><tr><th>Name</th><th>HP</th></tr>      | Name | HP |
//!        <tr><td>Goblin</td><td>7</td></tr>  →  | --- | --- |
//! </table>                                      | Goblin | 7 |
//! ```

use htmd::Element;
use thiserror::Error;

/// Marks the start of a converted cell inside a row.
const CELL: char = '\u{E000}';
/// Marks a converted row inside a table.
const ROW: char = '\u{E001}';

#[derive(Error, Debug)]
#[error("HTML conversion failed: {0}")]
pub struct RenderError(pub String);

/// Converts an HTML fragment into markdown.
pub trait HtmlRenderer {
    fn render(&self, html: &str) -> Result<String, RenderError>;
}

/// Default renderer backed by `htmd`.
pub struct HtmdRenderer {
    converter: htmd::HtmlToMarkdown,
}

impl HtmdRenderer {
    pub fn new() -> Self {
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style"])
            .add_handler(vec!["td", "th"], table_cell)
            .add_handler(vec!["tr"], table_row)
            .add_handler(vec!["table"], table)
            .build();
        Self { converter }
    }
}

impl Default for HtmdRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// One cell on one line: block breaks become `<br>`, pipes are escaped.
fn table_cell(element: Element) -> Option<String> {
    let text = element
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
        .replace('|', "\\|");
    Some(format!("{CELL}{text}"))
}

fn table_row(element: Element) -> Option<String> {
    if !element.content.contains(CELL) {
        return Some(String::new());
    }
    Some(format!("\n{ROW}{}\n", element.content.replace('\n', " ")))
}

fn table(element: Element) -> Option<String> {
    let mut rows: Vec<Vec<&str>> = Vec::new();
    let mut other: Vec<&str> = Vec::new();
    for line in element.content.lines().map(str::trim) {
        match line.strip_prefix(ROW) {
            Some(row) => rows.push(row.split(CELL).skip(1).map(str::trim).collect()),
            None if !line.is_empty() => other.push(line),
            None => {}
        }
    }
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Some(format!("\n\n{}\n\n", other.join("\n\n")));
    }

    let mut lines: Vec<String> = other.iter().map(|line| line.to_string()).collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.clone();
        cells.resize(columns, "");
        lines.push(format!("| {} |", cells.join(" | ")));
        if i == 0 {
            lines.push(format!("| {} |", vec!["---"; columns].join(" | ")));
        }
    }
    Some(format!("\n\n{}\n\n", lines.join("\n")))
}

impl HtmlRenderer for HtmdRenderer {
    fn render(&self, html: &str) -> Result<String, RenderError> {
        self.converter
            .convert(html)
            .map(|md| md.trim().to_string())
            .map_err(|e| RenderError(e.to_string()))
    }
}
