//! Attribute values and rows carried alongside geometries

use std::fmt;

/// A single attribute cell
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Logical(bool),
    /// Calendar date from a `.dbf` date column
    Date { year: u32, month: u32, day: u32 },
    Null,
}

impl AttributeValue {
    /// Text cell from raw input; blank strings become `Null`
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            AttributeValue::Null
        } else {
            AttributeValue::Text(raw.to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{}", s),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Logical(b) => write!(f, "{}", b),
            AttributeValue::Date { year, month, day } => write!(f, "{:04}-{:02}-{:02}", year, month, day),
            AttributeValue::Null => Ok(()),
        }
    }
}

/// Ordered attribute row, one per feature
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttributeRow {
    values: Vec<(String, AttributeValue)>,
}

impl AttributeRow {
    pub fn new() -> Self {
        AttributeRow { values: Vec::new() }
    }

    /// Append a column value
    pub fn push(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.values.push((name.into(), value));
    }

    /// Look up a value by column name
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for AttributeRow {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        AttributeRow { values: iter.into_iter().collect() }
    }
}

/// Raw tabular input: a header row plus string cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// One data row with its 1-based line number in the source
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub line: u64,
    pub values: Vec<String>,
}

impl RecordTable {
    /// Position of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}
