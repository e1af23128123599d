//! Reshaping cached values into tables
//!
//! A cache may hold an extracted table directly, or a structured form of it:
//! a list of record objects or a column-oriented mapping of equal-length
//! lists. Anything else is a [`KpiError::ConversionError`].

use crate::error::KpiError;
use crate::types::{FieldValue, FlatRow, Table};
use serde_json::{Map, Value};

/// A value stored under a cache key
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Table(Table),
    /// `[{"type": ..., "value": ...}, ...]`
    Records(Vec<Map<String, Value>>),
    /// `{"type": [...], "value": [...]}`
    Columns(Map<String, Value>),
}

impl From<Table> for CachedValue {
    fn from(table: Table) -> Self {
        CachedValue::Table(table)
    }
}

impl CachedValue {
    /// Classify a JSON value by shape
    pub fn from_json(value: Value) -> Result<Self, KpiError> {
        match value {
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| match item {
                        Value::Object(map) => Ok(map),
                        other => Err(KpiError::ConversionError(format!(
                            "record {index} is {} rather than an object",
                            kind(&other)
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CachedValue::Records(records))
            }
            Value::Object(map) => {
                if map.contains_key("columns") && map.contains_key("rows") {
                    if let Ok(table) = serde_json::from_value::<Table>(Value::Object(map.clone())) {
                        return Ok(CachedValue::Table(table));
                    }
                }
                Ok(CachedValue::Columns(map))
            }
            other => Err(KpiError::ConversionError(format!(
                "cached value is {}, expected a list or mapping",
                kind(&other)
            ))),
        }
    }

    /// Parse a JSON document and classify it
    pub fn from_json_str(json: &str) -> Result<Self, KpiError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(value)
    }

    /// Reshape into a table
    pub fn into_table(self) -> Result<Table, KpiError> {
        match self {
            CachedValue::Table(table) => Ok(table),
            CachedValue::Records(records) => {
                let rows = records
                    .into_iter()
                    .map(object_to_row)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Table::from_rows(rows))
            }
            CachedValue::Columns(columns) => columns_to_table(columns),
        }
    }
}

fn columns_to_table(columns: Map<String, Value>) -> Result<Table, KpiError> {
    let mut names = Vec::with_capacity(columns.len());
    let mut lists = Vec::with_capacity(columns.len());

    for (name, value) in columns {
        match value {
            Value::Array(values) => {
                names.push(name);
                lists.push(values);
            }
            other => {
                return Err(KpiError::ConversionError(format!(
                    "column '{name}' is {} rather than a list",
                    kind(&other)
                )))
            }
        }
    }

    let length = lists.first().map(Vec::len).unwrap_or(0);
    if let Some((name, list)) = names
        .iter()
        .zip(&lists)
        .find(|(_, list)| list.len() != length)
    {
        return Err(KpiError::ConversionError(format!(
            "column '{name}' has {} values, expected {length}",
            list.len()
        )));
    }

    let mut rows = vec![FlatRow::new(); length];
    for (name, list) in names.iter().zip(lists) {
        for (row, value) in rows.iter_mut().zip(list) {
            row.insert(name.as_str(), json_to_field(value)?);
        }
    }

    Ok(Table::with_columns(names, rows))
}

fn object_to_row(object: Map<String, Value>) -> Result<FlatRow, KpiError> {
    let mut row = FlatRow::new();
    for (name, value) in object {
        row.insert(name, json_to_field(value)?);
    }
    Ok(row)
}

fn json_to_field(value: Value) -> Result<FieldValue, KpiError> {
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
        Value::Number(n) => Ok(n.as_f64().map(FieldValue::Number).unwrap_or(FieldValue::Null)),
        Value::String(s) => Ok(FieldValue::Text(s)),
        Value::Array(items) => {
            let rows = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => object_to_row(map),
                    other => Err(KpiError::ConversionError(format!(
                        "nested list holds {} rather than objects",
                        kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FieldValue::List(rows))
        }
        Value::Object(_) => Err(KpiError::ConversionError(
            "nested object cannot be stored in a table cell".to_string(),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_to_table() {
        let value = json!([
            {"type": "HKQuantityTypeIdentifierHeartRate", "value": "72"},
            {"type": "HKQuantityTypeIdentifierHeartRate", "value": 80, "unit": "count/min"}
        ]);

        let table = CachedValue::from_json(value).unwrap().into_table().unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "value").as_f64(), Some(72.0));
        assert_eq!(table.cell(1, "value").as_f64(), Some(80.0));
        assert!(table.cell(0, "unit").is_null());
    }

    #[test]
    fn test_columns_to_table() {
        let value = json!({
            "type": ["A", "B"],
            "value": ["1", null]
        });

        let table = CachedValue::from_json(value).unwrap().into_table().unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, "type").as_str(), Some("B"));
        assert!(table.cell(1, "value").is_null());
    }

    #[test]
    fn test_ragged_columns_fail() {
        let value = json!({"type": ["A", "B"], "value": ["1"]});
        let result = CachedValue::from_json(value).unwrap().into_table();
        assert!(matches!(result, Err(KpiError::ConversionError(_))));
    }

    #[test]
    fn test_scalar_fails() {
        let result = CachedValue::from_json(json!("export.xml"));
        assert!(matches!(result, Err(KpiError::ConversionError(_))));
    }

    #[test]
    fn test_serialized_table_roundtrip() {
        let row: FlatRow = [("type", "A")].into_iter().collect();
        let table = Table::from_rows(vec![row]);
        let json = serde_json::to_string(&table).unwrap();

        let cached = CachedValue::from_json_str(&json).unwrap();

        assert_eq!(cached, CachedValue::Table(table));
    }

    #[test]
    fn test_nested_lists_become_child_rows() {
        let value = json!([{"type": "A", "MetadataEntry": [{"key": "k", "value": "v"}]}]);

        let table = CachedValue::from_json(value).unwrap().into_table().unwrap();

        let entries = table.cell(0, "MetadataEntry").as_list().unwrap();
        assert_eq!(entries[0].get("key").and_then(FieldValue::as_str), Some("k"));
    }
}
