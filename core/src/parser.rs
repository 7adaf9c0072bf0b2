//! Flat-file parser: delimited text to header-keyed rows.
//!
//! Input is split on line boundaries first; blank lines are dropped and a
//! record never spans lines. Each line is then tokenized with the csv crate
//! so double-quoted fields may carry embedded commas.

use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;

const BOM: char = '\u{feff}';

/// One data line, keyed by normalized (trimmed, upper-case) header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Value of `column`, or "" when the column is missing.
    pub fn get(&self, column: &str) -> &str {
        self.fields
            .get(&normalize_header(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// First non-blank value among `columns`.
    pub fn get_any(&self, columns: &[&str]) -> &str {
        columns
            .iter()
            .map(|c| self.get(c))
            .find(|v| !v.trim().is_empty())
            .unwrap_or("")
    }

    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows:    Vec<RawRow>,
}

pub fn normalize_header(h: &str) -> String {
    h.trim().to_ascii_uppercase()
}

/// Parse delimited text. Fewer than two non-empty lines yields no rows.
pub fn parse(text: &str) -> ParsedFile {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header_line = match lines.next() {
        Some(l) => l.trim_start_matches(BOM),
        None => return ParsedFile::default(),
    };
    let headers: Vec<String> = split_line(header_line, 0)
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let rows: Vec<RawRow> = lines
        .map(|line| {
            let values = split_line(line, headers.len());
            let fields = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), values.get(i).cloned().unwrap_or_default()))
                .collect();
            RawRow { fields }
        })
        .collect();

    log::debug!("parsed {} rows across {} columns", rows.len(), headers.len());
    ParsedFile { headers, rows }
}

/// Tokenize one line. A stray quote makes the csv reader swallow the rest
/// of the line into one field, so unbalanced quoting, or quoting that
/// leaves fewer than `expected` fields, falls back to a plain comma split.
fn split_line(line: &str, expected: usize) -> Vec<String> {
    let quotes = line.matches('"').count();
    if quotes % 2 == 1 {
        return comma_split(line);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) if quotes == 0 || record.len() >= expected => {
            record.iter().map(str::to_string).collect()
        }
        _ => comma_split(line),
    }
}

fn comma_split(line: &str) -> Vec<String> {
    line.split(',')
        .map(|v| v.trim().trim_matches('"').trim().to_string())
        .collect()
}
