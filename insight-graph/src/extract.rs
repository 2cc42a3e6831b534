//! Table detection in free-form agent answers
//!
//! Agents are asked to answer with CSV when they can, but nothing guarantees
//! it. [`TableExtractor::extract`] decides whether an answer *is* a table and
//! returns `None` when it is not. A `None` is the plain-text outcome, not an
//! error.

use anyhow::{bail, Result};
use serde::Serialize;

// TODO: sniff tab/semicolon/pipe delimiters when the first line has no comma,
// so markdown-style pipe tables stop falling through to plain text.

/// Header plus rows, every row as wide as the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ParsedTable {
    pub(crate) fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if header.is_empty() {
            bail!("Table header must have at least one column");
        }
        if let Some(idx) = rows.iter().position(|row| row.len() != header.len()) {
            bail!(
                "Row {} has {} fields, header has {}",
                idx + 1,
                rows[idx].len(),
                header.len()
            );
        }
        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, top to bottom
    pub fn column(&self, idx: usize) -> Option<Vec<&str>> {
        if idx >= self.header.len() {
            return None;
        }
        Some(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }
}

/// Heuristic delimiter-separated table parser
#[derive(Debug, Clone)]
pub struct TableExtractor {
    delimiter: u8,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl TableExtractor {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Parse `text` as a table, or return `None` if it does not look like one
    ///
    /// 1. Fence markers are removed: a leading ```` ``` ```` (with an optional
    ///    `csv`/`CSV` tag) at the start of a line and a trailing ```` ``` ````
    ///    at the end of a line.
    /// 2. Empty text, or a first non-blank line without the delimiter: `None`.
    /// 3. The rest is parsed as delimited text; the first record is the header.
    ///    Empty lines between records are skipped.
    /// 4. Any row whose width differs from the header discards the whole table.
    /// 5. Any parse error is `None`.
    pub fn extract(&self, text: &str) -> Option<ParsedTable> {
        let cleaned = strip_fences(text.trim());
        let first = cleaned.lines().find(|line| !line.trim().is_empty())?;
        if !first.contains(char::from(self.delimiter)) {
            return None;
        }

        self.parse(&cleaned)
    }

    fn parse(&self, cleaned: &str) -> Option<ParsedTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(cleaned.as_bytes());

        let mut records = reader.records();
        let header: Vec<String> = records.next()?.ok()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in records {
            let record = record.ok()?;
            if record.len() != header.len() {
                return None;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        ParsedTable::new(header, rows).ok()
    }
}

/// Opening marker with an optional language tag and nothing else on the line
fn is_fence_line(line: &str) -> bool {
    match line.trim().strip_prefix("```") {
        Some(tag) => tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')),
        None => false,
    }
}

fn strip_fence_markers(line: &str) -> &str {
    if is_fence_line(line) {
        return "";
    }
    let line = match line.strip_prefix("```") {
        Some(rest) => rest
            .strip_prefix("csv")
            .or_else(|| rest.strip_prefix("CSV"))
            .unwrap_or(rest),
        None => line,
    };
    line.trim_end().strip_suffix("```").unwrap_or(line)
}

/// Remove fence markers, leaving every other character in place
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .map(strip_fence_markers)
        .collect::<Vec<_>>()
        .join("\n")
}
