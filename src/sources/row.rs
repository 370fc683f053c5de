use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single column value as exposed by a provider table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

/// One provider row. Accessors return `None` for missing or null columns;
/// the `_or_default` variants normalize those to `""` / `0`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column setter
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Text value of a column. Integers are rendered as decimal text.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.columns.get(column)? {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Null => None,
        }
    }

    /// Integer value of a column. Numeric text is parsed.
    pub fn int(&self, column: &str) -> Option<i64> {
        match self.columns.get(column)? {
            Value::Integer(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    pub fn text_or_default(&self, column: &str) -> String {
        self.text(column).unwrap_or_default()
    }

    pub fn int_or_zero(&self, column: &str) -> i64 {
        self.int(column).unwrap_or(0)
    }

    /// Non-negative integer value; negatives and missing values become zero
    pub fn unsigned_or_zero(&self, column: &str) -> u64 {
        u64::try_from(self.int_or_zero(column)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_null_columns_normalize() {
        let row = Row::new().with("body", Value::Null);
        assert_eq!(row.text_or_default("body"), "");
        assert_eq!(row.text_or_default("address"), "");
        assert_eq!(row.int_or_zero("date"), 0);
    }

    #[test]
    fn test_numeric_text_parses() {
        let row = Row::new().with("size", "2048").with("date", 17);
        assert_eq!(row.int("size"), Some(2048));
        assert_eq!(row.text("date").as_deref(), Some("17"));
    }

    #[test]
    fn test_negative_size_clamps_to_zero() {
        let row = Row::new().with("size", -5);
        assert_eq!(row.unsigned_or_zero("size"), 0);
    }

    #[test]
    fn test_row_deserializes_from_json_object() {
        let row: Row = serde_json::from_str(r#"{"address":"555-0101","date":42,"person":null}"#).unwrap();
        assert_eq!(row.text("address").as_deref(), Some("555-0101"));
        assert_eq!(row.int("date"), Some(42));
        assert_eq!(row.get("person"), Some(&Value::Null));
    }
}
