//! CSV report files exchanged between the rollout tools.
//!
//! Records are one per line; fields may be double-quoted, with `""` as an
//! escaped quote. Quoted fields spanning lines are not supported.
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("report is empty (no header row)")]
    Empty,
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: missing column {column:?}")]
    MissingColumn { line: usize, column: String },
}

/// A data row keyed by header name, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    fields: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Non-empty value of `column`.
    pub fn require(&self, column: &str) -> Result<&str, ReportError> {
        self.get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ReportError::MissingColumn {
                line: self.line,
                column: column.to_string(),
            })
    }
}

fn split_record(line: &str, line_no: usize) -> Result<Vec<String>, ReportError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    if in_quotes {
        return Err(ReportError::UnterminatedQuote { line: line_no });
    }
    fields.push(field);
    Ok(fields)
}

pub fn parse(text: &str) -> Result<Vec<Record>, ReportError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let (header_no, header) = lines.next().ok_or(ReportError::Empty)?;
    let header: Vec<String> = split_record(header, header_no)?
        .into_iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    lines
        .map(|(line, raw)| {
            let values = split_record(raw, line)?;
            let fields = header
                .iter()
                .cloned()
                .zip(values.into_iter().chain(std::iter::repeat(String::new())))
                .collect();
            Ok(Record { line, fields })
        })
        .collect()
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn render(header: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    let header: Vec<String> = header.iter().map(|h| escape(h)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in rows {
        let row: Vec<String> = row.iter().map(|f| escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
