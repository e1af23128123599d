//! Response encoding
//!
//! This module renders KPI results and tables as JSON for transport layers.
//! Missing and non-finite numbers are emitted as `null` so they never
//! masquerade as a real zero.

use crate::error::KpiError;
use crate::types::{AggregateTable, FieldValue, FlatRow, Granularity, KpiResult, Table};
use serde_json::{json, Map, Value};

/// Encoder for KPI responses
pub struct KpiEncoder;

impl KpiEncoder {
    /// Encode a KPI result as `{"status": "success", "data": {...}}`
    pub fn encode(result: &KpiResult) -> Value {
        json!({
            "status": "success",
            "data": {
                "daily_avg": Self::encode_aggregate(&result.daily_avg),
                "weekly_avg": Self::encode_aggregate(&result.weekly_avg),
                "monthly_avg": Self::encode_aggregate(&result.monthly_avg),
                "overall_avg": finite_or_null(result.overall_avg),
                "overall_avg_ev": finite_or_null(result.overall_avg_ev),
            }
        })
    }

    /// Encode to a JSON string
    pub fn encode_to_json(result: &KpiResult, pretty: bool) -> Result<String, KpiError> {
        let value = Self::encode(result);
        let json = if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(json)
    }

    /// Encode one aggregate table as ordered records.
    ///
    /// Daily rows carry `evolution` once it has been computed.
    pub fn encode_aggregate(table: &AggregateTable) -> Value {
        let key_field = table.granularity.key_field();
        let average_field = table.granularity.average_field();

        let rows = table
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                record.insert(key_field.to_string(), Value::String(row.label.clone()));
                record.insert(average_field.to_string(), finite_or_null(row.average));
                if table.granularity == Granularity::Day {
                    if let Some(evolution) = row.evolution {
                        record.insert("evolution".to_string(), finite_or_null(Some(evolution)));
                    }
                }
                Value::Object(record)
            })
            .collect();

        Value::Array(rows)
    }

    /// Encode a table as records carrying every column
    pub fn encode_table(table: &Table) -> Value {
        let rows = (0..table.len())
            .map(|index| {
                let record: Map<String, Value> = table
                    .columns()
                    .iter()
                    .map(|column| (column.clone(), encode_field(table.cell(index, column))))
                    .collect();
                Value::Object(record)
            })
            .collect();

        Value::Array(rows)
    }

    /// Encode an error as `{"status": "error", "code": ..., "message": ...}`
    pub fn encode_error(error: &KpiError) -> Value {
        json!({
            "status": "error",
            "code": error.code(),
            "message": error.to_string(),
        })
    }
}

/// `null` for missing or non-finite numbers
pub fn finite_or_null(value: Option<f64>) -> Value {
    match value {
        Some(v) if v.is_finite() => json!(v),
        _ => Value::Null,
    }
}

fn encode_field(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Number(n) => finite_or_null(Some(*n)),
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::List(rows) => Value::Array(rows.iter().map(encode_row).collect()),
    }
}

fn encode_row(row: &FlatRow) -> Value {
    Value::Object(
        row.iter()
            .map(|(name, value)| (name.clone(), encode_field(value)))
            .collect(),
    )
}
