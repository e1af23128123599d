//! Core types for the Vitals KPI pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw hierarchical records, flat rows and tables, normalized samples,
//! aggregate tables and the terminal KPI result.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One hierarchical export element: a tag, its attributes and nested elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Element tag (e.g. "Record", "MetadataEntry")
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Nested elements in document order
    pub children: Vec<RawRecord>,
}

impl RawRecord {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: RawRecord) -> Self {
        self.children.push(child);
        self
    }

    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A single cell of a flat row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
    /// Flattened child elements sharing one tag
    List(Vec<FlatRow>),
}

static NULL_FIELD: FieldValue = FieldValue::Null;

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FlatRow]> {
        match self {
            FieldValue::List(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }

    /// Coerce to a number. Unparsable text, lists, nulls and NaN are missing.
    pub fn as_f64(&self) -> Option<f64> {
        let parsed = match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Null | FieldValue::List(_) => None,
        };
        parsed.filter(|n| !n.is_nan())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// Flat mapping of field name to value, one per top-level record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRow(BTreeMap<String, FieldValue>);

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, FieldValue>> for FlatRow {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FlatRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Ordered rows with a column set equal to the union of all row fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<FlatRow>,
}

impl Table {
    /// Build a table, keeping row order and listing columns by first appearance
    pub fn from_rows(rows: Vec<FlatRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Build a table with a known leading column order (e.g. a CSV header).
    /// Fields not listed are appended by first appearance.
    pub fn with_columns(columns: Vec<String>, rows: Vec<FlatRow>) -> Self {
        let mut table = Self::from_rows(rows);
        let extra: Vec<String> = table
            .columns
            .drain(..)
            .filter(|c| !columns.contains(c))
            .collect();
        table.columns = columns;
        table.columns.extend(extra);
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell lookup; rows lacking the column read as `Null`
    pub fn cell(&self, row: usize, column: &str) -> &FieldValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL_FIELD)
    }

    /// All values of one column in row order, `Null` where absent
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a FieldValue> {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&NULL_FIELD))
    }
}

/// How ISO week buckets are labelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekLabel {
    /// `2024-W03`
    #[default]
    Iso,
    /// `2024-01-15/2024-01-21` (Monday through Sunday)
    Range,
}

/// Time granularity of an aggregate bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// First calendar date of the bucket containing `date`.
    ///
    /// `None` when that date falls outside the representable calendar.
    pub fn bucket_start(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Day => Some(date),
            Granularity::Week => date.checked_sub_signed(Duration::days(i64::from(
                date.weekday().num_days_from_monday(),
            ))),
            Granularity::Month => date.with_day(1),
        }
    }

    /// Human-readable label for a bucket start
    pub fn label(&self, start: NaiveDate, week_label: WeekLabel) -> String {
        match self {
            Granularity::Day => start.format("%Y-%m-%d").to_string(),
            Granularity::Week => match week_label {
                WeekLabel::Iso => {
                    let week = start.iso_week();
                    format!("{}-W{:02}", week.year(), week.week())
                }
                WeekLabel::Range => match start.checked_add_signed(Duration::days(6)) {
                    Some(end) => {
                        format!("{}/{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
                    }
                    None => self.label(start, WeekLabel::Iso),
                },
            },
            Granularity::Month => start.format("%Y-%m").to_string(),
        }
    }

    /// Field name carrying the bucket key in encoded output
    pub fn key_field(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }

    /// Field name carrying the average in encoded output
    pub fn average_field(&self) -> &'static str {
        match self {
            Granularity::Day => "daily_avg",
            Granularity::Week => "weekly_avg",
            Granularity::Month => "monthly_avg",
        }
    }
}

/// A filtered row with parsed timestamps, numeric value and bucket keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSample {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    /// Numeric value, `None` when the source value was not a number
    pub value: Option<f64>,
    /// Calendar date of `start`
    pub day: Option<NaiveDate>,
    /// Monday of the ISO week of `start`
    pub week: Option<NaiveDate>,
    /// First day of the month of `start`
    pub month: Option<NaiveDate>,
}

impl NormalizedSample {
    /// Bucket key for a granularity
    pub fn bucket(&self, granularity: Granularity) -> Option<NaiveDate> {
        match granularity {
            Granularity::Day => self.day,
            Granularity::Week => self.week,
            Granularity::Month => self.month,
        }
    }
}

/// One aggregated bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// First calendar date of the bucket
    pub bucket: NaiveDate,
    pub label: String,
    /// Mean of present values, `None` when the bucket had none
    pub average: Option<f64>,
    /// Percentage change from the previous bucket (daily table after summarizing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution: Option<f64>,
}

/// Ordered (bucket, average) rows for one granularity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub granularity: Granularity,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn averages(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.average).collect()
    }
}

/// Terminal output of one KPI computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiResult {
    /// Metric identifier the KPIs were computed for
    pub metric: String,
    /// Number of rows matching the metric
    pub sample_count: usize,
    pub daily_avg: AggregateTable,
    pub weekly_avg: AggregateTable,
    pub monthly_avg: AggregateTable,
    pub overall_avg: Option<f64>,
    pub overall_avg_ev: Option<f64>,
}
