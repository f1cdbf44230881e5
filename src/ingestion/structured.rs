use crate::error::{MergeError, Result};
use crate::table::{Table, Value};
use metrics::counter;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

/// Reads a JSON array of flat objects into a [`Table`].
///
/// Columns are the union of keys in first-occurrence order. Keys a record
/// lacks are `Null`. Nested arrays or objects are kept as compact JSON text.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_json_records(path: &Path) -> Result<Table> {
    let content = fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
    let table = parse_json_records(&content).map_err(|message| MergeError::format(path, message))?;

    debug!(
        "Loaded {} records x {} columns",
        table.row_count(),
        table.column_count()
    );
    counter!("delivery_merge_rows_loaded_total", "source" => "structured")
        .increment(table.row_count() as u64);
    Ok(table)
}

/// Parses the document text. Errors carry a human-readable reason.
pub fn parse_json_records(content: &str) -> std::result::Result<Table, String> {
    // serde_json rejects trailing content after the top-level value
    let doc: JsonValue = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let items = match doc {
        JsonValue::Array(items) => items,
        other => {
            return Err(format!(
                "expected a top-level array of objects, found {}",
                json_kind(&other)
            ))
        }
    };

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut objects = Vec::with_capacity(items.len());

    for (i, item) in items.into_iter().enumerate() {
        match item {
            JsonValue::Object(map) => {
                for key in map.keys() {
                    if !positions.contains_key(key) {
                        positions.insert(key.clone(), columns.len());
                        columns.push(key.clone());
                    }
                }
                objects.push(map);
            }
            other => {
                return Err(format!(
                    "element {} is {}, expected an object",
                    i,
                    json_kind(&other)
                ))
            }
        }
    }

    let width = columns.len();
    let mut table = Table::new(columns);
    for map in objects {
        let mut row = vec![Value::Null; width];
        for (key, value) in map {
            row[positions[&key]] = to_value(value);
        }
        table.push_row(row);
    }
    Ok(table)
}

fn to_value(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        JsonValue::String(s) => Value::Text(s),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Value::Text(nested.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
