use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Spellings treated as a missing cell when reading delimited text.
const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Spellings read as booleans from delimited text.
const TRUE_MARKERS: &[&str] = &["True", "TRUE", "true"];
const FALSE_MARKERS: &[&str] = &["False", "FALSE", "false"];

/// A single cell. `Null` is the missing-value marker for every stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    /// Parses a raw delimited-text cell into the most specific type.
    pub fn infer(raw: &str) -> Value {
        if NA_MARKERS.contains(&raw) {
            return Value::Null;
        }
        if TRUE_MARKERS.contains(&raw) {
            return Value::Bool(true);
        }
        if FALSE_MARKERS.contains(&raw) {
            return Value::Bool(false);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality key used by joins and distinct counts. `Null` has no key.
    pub fn key(&self) -> Option<CellKey> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(CellKey::Int(*i)),
            Value::Float(f) => {
                if f.is_nan() {
                    None
                } else if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Some(CellKey::Int(*f as i64))
                } else {
                    Some(CellKey::Float(f.to_bits()))
                }
            }
            Value::Bool(b) => Some(CellKey::Bool(*b)),
            Value::Text(s) => Some(CellKey::Text(s.clone())),
        }
    }

    /// Text written to a delimited file. Integral floats keep a `.0`.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 => {
                format!("{:.1}", f)
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NaN"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Hashable identity of a non-null cell; `7` and `7.0` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

/// Column-ordered, row-ordered in-memory table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding with `Null` or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column in row order, or `None` if the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Lookup from key value to the row indices holding it, in load order.
    pub fn index_by(&self, column: &str) -> Option<HashMap<CellKey, Vec<usize>>> {
        let idx = self.column_index(column)?;
        let mut index: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(key) = row[idx].key() {
                index.entry(key).or_default().push(i);
            }
        }
        Some(index)
    }
}

/// Builds a table from a header and literal rows.
impl<const N: usize> From<([&str; N], Vec<[Value; N]>)> for Table {
    fn from((columns, rows): ([&str; N], Vec<[Value; N]>)) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.into());
        }
        table
    }
}
