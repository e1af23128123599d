//! Period aggregation
//!
//! This module buckets normalized samples by calendar day, ISO week and
//! calendar month and averages each bucket. Missing values are skipped; a
//! bucket holding only missing values has a missing average.

use crate::types::{AggregateRow, AggregateTable, Granularity, NormalizedSample, WeekLabel};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Day, week and month aggregate tables, in that order
pub type PeriodTables = (AggregateTable, AggregateTable, AggregateTable);

/// Aggregator producing the three-tier rolling averages
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodAggregator {
    week_label: WeekLabel,
}

impl PeriodAggregator {
    pub fn new(week_label: WeekLabel) -> Self {
        Self { week_label }
    }

    /// Aggregate samples at day, week and month granularity
    pub fn aggregate(&self, samples: &[NormalizedSample]) -> PeriodTables {
        (
            self.aggregate_by(samples, Granularity::Day),
            self.aggregate_by(samples, Granularity::Week),
            self.aggregate_by(samples, Granularity::Month),
        )
    }

    /// Aggregate samples at one granularity, ordered by bucket start.
    ///
    /// Samples without a bucket key (unparsable start date) are excluded.
    pub fn aggregate_by(
        &self,
        samples: &[NormalizedSample],
        granularity: Granularity,
    ) -> AggregateTable {
        let mut buckets: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
        let mut unbucketed = 0usize;

        for sample in samples {
            match sample.bucket(granularity) {
                Some(bucket) => buckets.entry(bucket).or_default().push(sample.value),
                None => unbucketed += 1,
            }
        }

        if unbucketed > 0 {
            tracing::debug!(?granularity, unbucketed, "samples excluded from buckets");
        }

        let rows = buckets
            .into_iter()
            .map(|(bucket, acc)| AggregateRow {
                bucket,
                label: granularity.label(bucket, self.week_label),
                average: acc.mean(),
                evolution: None,
            })
            .collect();

        AggregateTable { granularity, rows }
    }
}

/// Running sum over present values
#[derive(Debug, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

/// Mean of the present values; `None` when there are none
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut acc = Accumulator::default();
    for value in values {
        acc.push(value);
    }
    acc.mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::{parse_timestamp, Normalizer};

    fn sample(ts: &str, value: Option<f64>) -> NormalizedSample {
        let start = parse_timestamp(ts);
        Normalizer::sample(start, start, value)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_means() {
        let samples = vec![
            sample("2024-01-15 08:00:00 +0000", Some(10.0)),
            sample("2024-01-15 20:00:00 +0000", Some(20.0)),
            sample("2024-01-16 08:00:00 +0000", Some(30.0)),
        ];

        let (daily, _, _) = PeriodAggregator::default().aggregate(&samples);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily.rows[0].bucket, day(2024, 1, 15));
        assert_eq!(daily.rows[0].label, "2024-01-15");
        assert_eq!(daily.rows[0].average, Some(15.0));
        assert_eq!(daily.rows[1].average, Some(30.0));
    }

    #[test]
    fn test_weekly_and_monthly_ordering() {
        let samples = vec![
            sample("2024-02-05 08:00:00 +0000", Some(60.0)),
            sample("2024-01-15 08:00:00 +0000", Some(70.0)),
            sample("2024-01-17 08:00:00 +0000", Some(80.0)),
        ];

        let (_, weekly, monthly) = PeriodAggregator::default().aggregate(&samples);

        let labels: Vec<&str> = weekly.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-W03", "2024-W06"]);
        assert_eq!(weekly.rows[0].average, Some(75.0));

        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly.rows[0].label, "2024-01");
        assert_eq!(monthly.rows[0].average, Some(75.0));
        assert_eq!(monthly.rows[1].label, "2024-02");
    }

    #[test]
    fn test_missing_values_skipped() {
        let samples = vec![
            sample("2024-01-15 08:00:00 +0000", Some(10.0)),
            sample("2024-01-15 09:00:00 +0000", None),
            sample("2024-01-16 08:00:00 +0000", None),
        ];

        let daily = PeriodAggregator::default().aggregate_by(&samples, Granularity::Day);

        assert_eq!(daily.rows[0].average, Some(10.0));
        assert_eq!(daily.rows[1].average, None);
    }

    #[test]
    fn test_unparsable_dates_excluded() {
        let samples = vec![
            sample("2024-01-15 08:00:00 +0000", Some(10.0)),
            sample("not a date", Some(1000.0)),
        ];

        let (daily, weekly, monthly) = PeriodAggregator::default().aggregate(&samples);

        assert_eq!(daily.averages(), vec![Some(10.0)]);
        assert_eq!(weekly.averages(), vec![Some(10.0)]);
        assert_eq!(monthly.averages(), vec![Some(10.0)]);
    }

    #[test]
    fn test_range_week_labels() {
        let samples = vec![sample("2024-01-17 08:00:00 +0000", Some(1.0))];

        let weekly = PeriodAggregator::new(WeekLabel::Range).aggregate_by(&samples, Granularity::Week);

        assert_eq!(weekly.rows[0].label, "2024-01-15/2024-01-21");
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let samples = vec![
            sample("2024-01-15 08:00:00 +0000", Some(10.0)),
            sample("2024-01-22 08:00:00 +0000", Some(12.0)),
        ];
        let aggregator = PeriodAggregator::default();

        assert_eq!(aggregator.aggregate(&samples), aggregator.aggregate(&samples));
    }

    #[test]
    fn test_mean_present() {
        assert_eq!(mean_present(vec![Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_present(vec![None, None]), None);
        assert_eq!(mean_present(Vec::new()), None);
    }
}
