//! Metric filtering and normalization
//!
//! This module selects the rows of one metric from an extracted table and
//! normalizes them into samples:
//! - `startDate` / `endDate` parsed into timestamps
//! - `value` coerced to a number (missing when unparsable, never an error)
//! - Day, ISO week and month bucket keys derived from the start timestamp

use crate::types::{FieldValue, Granularity, NormalizedSample, Table};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Column holding the metric identifier
pub const TYPE_FIELD: &str = "type";
/// Column holding the sample start timestamp
pub const START_FIELD: &str = "startDate";
/// Column holding the sample end timestamp
pub const END_FIELD: &str = "endDate";
/// Column holding the sample value
pub const VALUE_FIELD: &str = "value";

/// Timestamp layouts without an explicit offset; read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Filter and normalizer for one metric
pub struct Normalizer;

impl Normalizer {
    /// Select rows whose `type` equals `metric_id` exactly and normalize them.
    ///
    /// No matching row yields an empty vector. Rows with unparsable dates are
    /// kept with empty bucket keys.
    pub fn filter_and_normalize(table: &Table, metric_id: &str) -> Vec<NormalizedSample> {
        let samples: Vec<NormalizedSample> = table
            .rows()
            .iter()
            .filter(|row| row.get(TYPE_FIELD).and_then(FieldValue::as_str) == Some(metric_id))
            .map(|row| {
                let start = row.get(START_FIELD).and_then(parse_field_timestamp);
                let end = row.get(END_FIELD).and_then(parse_field_timestamp);
                let value = row.get(VALUE_FIELD).and_then(FieldValue::as_f64);
                Self::sample(start, end, value)
            })
            .collect();

        let missing_values = samples.iter().filter(|s| s.value.is_none()).count();
        let missing_dates = samples.iter().filter(|s| s.start.is_none()).count();
        if missing_values > 0 || missing_dates > 0 {
            tracing::warn!(
                metric = metric_id,
                missing_values,
                missing_dates,
                "samples with unusable fields"
            );
        }
        tracing::debug!(metric = metric_id, samples = samples.len(), "normalized samples");

        samples
    }

    /// Build a sample and derive its bucket keys from `start`
    pub fn sample(
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
        value: Option<f64>,
    ) -> NormalizedSample {
        let day = start.map(|ts| ts.date_naive());

        NormalizedSample {
            start,
            end,
            value,
            day,
            week: day.and_then(|d| Granularity::Week.bucket_start(d)),
            month: day.and_then(|d| Granularity::Month.bucket_start(d)),
        }
    }
}

fn parse_field_timestamp(value: &FieldValue) -> Option<DateTime<FixedOffset>> {
    value.as_str().and_then(parse_timestamp)
}

/// Parse an export timestamp.
///
/// Accepts `2024-01-15 08:30:00 +0100`, RFC 3339, naive date-times (UTC) and
/// bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}
