//! Record flattening and table extraction
//!
//! This module turns hierarchical export records into a flat table:
//! - Attributes become scalar fields
//! - Child elements are grouped by tag into ordered lists
//! - Rows keep input order; columns are the union of all fields

use crate::error::KpiError;
use crate::types::{FieldValue, FlatRow, RawRecord, Table};
use std::collections::BTreeMap;

/// Converts one hierarchical record into a flat row
pub struct RecordFlattener;

impl RecordFlattener {
    /// Flatten a record and all of its descendants.
    ///
    /// Attributes are inserted first, then one list field per child tag. A
    /// child tag sharing its name with an attribute replaces that attribute.
    pub fn flatten(node: &RawRecord) -> FlatRow {
        let mut row = FlatRow::new();

        for (name, value) in &node.attributes {
            row.insert(name.as_str(), value.as_str());
        }

        let mut grouped: BTreeMap<&str, Vec<FlatRow>> = BTreeMap::new();
        for child in &node.children {
            grouped
                .entry(child.tag.as_str())
                .or_default()
                .push(Self::flatten(child));
        }

        for (tag, children) in grouped {
            row.insert(tag, FieldValue::List(children));
        }

        row
    }
}

/// Assembles flattened records into a table
pub struct TableExtractor;

impl TableExtractor {
    /// Flatten every record in order and build a table.
    ///
    /// Fails with [`KpiError::EmptyResult`] when there is nothing to extract.
    pub fn extract(records: &[RawRecord]) -> Result<Table, KpiError> {
        let rows: Vec<FlatRow> = records.iter().map(RecordFlattener::flatten).collect();

        if rows.is_empty() {
            return Err(KpiError::EmptyResult(
                "no records found in input".to_string(),
            ));
        }

        let table = Table::from_rows(rows);
        tracing::debug!(
            rows = table.len(),
            columns = table.columns().len(),
            "extracted record table"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heart_rate_record(value: &str) -> RawRecord {
        RawRecord::new("Record")
            .with_attribute("type", "HKQuantityTypeIdentifierHeartRate")
            .with_attribute("value", value)
    }

    #[test]
    fn test_flatten_attributes_only() {
        let record = RawRecord::new("Record")
            .with_attribute("a", "1")
            .with_attribute("b", "2");

        let row = RecordFlattener::flatten(&record);

        let expected: FlatRow = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(row, expected);
    }

    #[test]
    fn test_flatten_groups_children_in_order() {
        let record = RawRecord::new("Record")
            .with_attribute("type", "HKQuantityTypeIdentifierHeartRateVariabilitySDNN")
            .with_child(RawRecord::new("X").with_attribute("n", "first"))
            .with_child(RawRecord::new("Y").with_attribute("n", "other"))
            .with_child(RawRecord::new("X").with_attribute("n", "second"));

        let row = RecordFlattener::flatten(&record);

        let xs = row.get("X").and_then(FieldValue::as_list).unwrap();
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].get("n").and_then(FieldValue::as_str), Some("first"));
        assert_eq!(xs[1].get("n").and_then(FieldValue::as_str), Some("second"));
        assert_eq!(row.get("Y").and_then(FieldValue::as_list).unwrap().len(), 1);
    }

    #[test]
    fn test_flatten_nested_recursively() {
        let beat = RawRecord::new("InstantaneousBeatsPerMinute").with_attribute("bpm", "61");
        let list = RawRecord::new("HeartRateVariabilityMetadataList").with_child(beat);
        let record = RawRecord::new("Record").with_child(list);

        let row = RecordFlattener::flatten(&record);

        let lists = row
            .get("HeartRateVariabilityMetadataList")
            .and_then(FieldValue::as_list)
            .unwrap();
        let beats = lists[0]
            .get("InstantaneousBeatsPerMinute")
            .and_then(FieldValue::as_list)
            .unwrap();
        assert_eq!(beats[0].get("bpm").and_then(FieldValue::as_str), Some("61"));
    }

    #[test]
    fn test_child_overrides_same_named_attribute() {
        let record = RawRecord::new("Record")
            .with_attribute("MetadataEntry", "attr")
            .with_child(RawRecord::new("MetadataEntry").with_attribute("key", "k"));

        let row = RecordFlattener::flatten(&record);

        assert!(row.get("MetadataEntry").and_then(FieldValue::as_list).is_some());
    }

    #[test]
    fn test_flatten_empty_record() {
        let row = RecordFlattener::flatten(&RawRecord::new("Record"));
        assert!(row.is_empty());
    }

    #[test]
    fn test_extract_empty_fails() {
        let result = TableExtractor::extract(&[]);
        assert!(matches!(result, Err(KpiError::EmptyResult(_))));
    }

    #[test]
    fn test_extract_preserves_order_and_union() {
        let records = vec![
            heart_rate_record("70"),
            RawRecord::new("Record")
                .with_attribute("type", "HKQuantityTypeIdentifierStepCount")
                .with_attribute("unit", "count"),
            heart_rate_record("80"),
        ];

        let table = TableExtractor::extract(&records).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "value").as_str(), Some("70"));
        assert_eq!(table.cell(2, "value").as_str(), Some("80"));
        assert!(table.cell(0, "unit").is_null());
        assert!(table.cell(1, "value").is_null());
        assert!(table.has_column("unit"));
    }

    #[test]
    fn test_extract_single_record() {
        let table = TableExtractor::extract(&[heart_rate_record("65")]).unwrap();
        assert_eq!(table.len(), 1);
    }
}
