//! Result set types.
//!
//! Defines the structures used to represent query results from the data store.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// The tabular outcome of executing one SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    /// Column names in the order the engine reports them.
    pub columns: Vec<String>,

    /// Rows in engine order.
    pub rows: Vec<Row>,

    /// Number of rows returned.
    pub row_count: usize,
}

impl ResultSet {
    /// Creates an empty result set with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a result set, deriving `row_count` from the rows.
    pub fn with_data(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// Returns true if the result set has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// One row: values keyed by column name, in column order.
///
/// Serializes as a JSON object whose keys follow the column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cell.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((column.into(), value.into()));
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.push(column, value);
        }
        row
    }

    /// Returns the value for a column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Iterates over `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Renders the row as a brace-delimited map literal, e.g.
    /// `{'name': 'Oak Desk', 'price': 349.0}`.
    pub fn to_literal(&self) -> String {
        let cells: Vec<String> = self
            .unique_cells()
            .map(|(name, value)| format!("{}: {}", quote(name), value.to_literal()))
            .collect();
        format!("{{{}}}", cells.join(", "))
    }

    /// Cells with duplicate column names collapsed to their last value,
    /// keeping the position of the first occurrence.
    fn unique_cells(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().enumerate().filter_map(move |(idx, (name, _))| {
            let first = self.cells.iter().position(|(n, _)| n == name)?;
            if first == idx {
                self.get(name).map(|value| (name.as_str(), value))
            } else {
                None
            }
        })
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<(&str, &Value)> = self.unique_cells().collect();
        let mut map = serializer.serialize_map(Some(cells.len()))?;
        for (name, value) in cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A single value from a query.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Signed integer (SQLite INTEGER).
    Int(i64),

    /// Floating point number (SQLite REAL).
    Float(f64),

    /// Text value.
    String(String),

    /// Binary data (SQLite BLOB).
    Bytes(Vec<u8>),
}

impl Value {
    /// Renders the value as it appears in result summaries.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "None".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => quote(s),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

/// Whole floats keep a trailing `.0`.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let repr = if f > 0.0 { "inf" } else { "-inf" };
        repr.to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Single quotes unless the text contains one and no double quote.
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\");
    if s.contains('\'') && !s.contains('"') {
        format!("\"{escaped}\"")
    } else {
        format!("'{}'", escaped.replace('\'', "\\'"))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
