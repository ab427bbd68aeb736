//! Batch file reading.
//!
//! A batch is either a `.json` file holding an array of objects, or JSONL
//! with one object per line.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read every record from `path`.
pub fn read_values(path: &Path) -> Result<Vec<Value>> {
    let is_json_array = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json_array {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return parse_json_array(&content)
            .with_context(|| format!("Failed to parse {}", path.display()));
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    parse_jsonl(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_json_array(content: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(content)? {
        Value::Array(values) => Ok(values),
        other => Err(anyhow!(
            "Expected a JSON array of records, found {}",
            kind_of(&other)
        )),
    }
}

/// Parse JSONL, skipping blank lines.
pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for (line_count, line) in reader.lines().enumerate() {
        let line_count = line_count + 1;
        let line = line.map_err(|e| anyhow!("Error reading line {line_count}: {e}"))?;

        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line)
            .map_err(|e| anyhow!("Error parsing JSON at line {line_count}: {e}"))?;
        values.push(value);
    }
    Ok(values)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
