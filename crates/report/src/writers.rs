use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::row::REPORT_FIELDS;

/// A report row carried a key outside the canonical field set. The CSV
/// writer is strict so a mapper regression cannot silently shift or drop
/// columns.
#[derive(Debug, Error)]
#[error("unexpected report field {field:?}")]
pub struct CsvSchemaError {
    pub field: String,
}

/// Serializes `value` to `path` with 2-space indentation. Non-ASCII text is
/// written as-is, not escaped.
pub async fn write_json<P: AsRef<Path>>(path: P, value: &Value) -> Result<()> {
    let mut buf = Vec::new();
    serde_json::to_writer_pretty(&mut buf, value).context("serializing report json")?;
    tokio::fs::write(path.as_ref(), buf)
        .await
        .with_context(|| format!("writing {}", path.as_ref().display()))?;
    Ok(())
}

/// Writes the canonical header row followed by one record per report row.
///
/// Comma delimiter, double-quote quoting (minimal: a cell is quoted only
/// when it contains a delimiter, quote, or line break), CRLF record ends.
pub async fn write_csv<P: AsRef<Path>>(path: P, rows: &[Map<String, Value>]) -> Result<()> {
    let mut out = String::new();
    push_record(&mut out, REPORT_FIELDS.iter().map(|name| (*name).to_string()));
    for row in rows {
        for key in row.keys() {
            if !REPORT_FIELDS.contains(&key.as_str()) {
                return Err(CsvSchemaError { field: key.clone() }.into());
            }
        }
        push_record(&mut out, REPORT_FIELDS.iter().map(|name| cell(row.get(*name))));
    }
    tokio::fs::write(path.as_ref(), out)
        .await
        .with_context(|| format!("writing {}", path.as_ref().display()))?;
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        // Rows are flat by construction; compact JSON is the fallback for
        // anything that slipped through anyway.
        Some(other) => other.to_string(),
    }
}

fn push_record<I: IntoIterator<Item = String>>(out: &mut String, cells: I) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape_cell(&cell));
    }
    out.push_str("\r\n");
}

fn escape_cell(cell: &str) -> String {
    let needs_quotes = cell
        .chars()
        .any(|ch| matches!(ch, '"' | ',' | '\n' | '\r'));
    if needs_quotes {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
