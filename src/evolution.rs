//! Evolution and overall averages
//!
//! This module summarizes a daily aggregate table into the overall average and
//! the mean day-over-day percentage change. The input table is left untouched;
//! a copy carrying the evolution column is returned instead.

use crate::types::AggregateTable;
use serde::{Deserialize, Serialize};

/// Daily table with evolution plus the two scalar summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Copy of the input table with `evolution` set on every row
    pub daily: AggregateTable,
    /// Sum of daily averages over the number of days
    pub overall_avg: Option<f64>,
    /// Sum of daily evolutions over the number of days
    pub overall_avg_ev: Option<f64>,
}

/// Calculator for overall averages and period-over-period evolution
pub struct EvolutionCalculator;

impl EvolutionCalculator {
    /// Summarize a daily aggregate table.
    ///
    /// Missing daily averages contribute zero to the sum but still count as a
    /// day. An empty table has missing summaries.
    pub fn summarize(daily: &AggregateTable) -> Summary {
        let averages = daily.averages();
        let evolutions = Self::evolution(&averages);

        let mut table = daily.clone();
        for (row, evolution) in table.rows.iter_mut().zip(&evolutions) {
            row.evolution = Some(*evolution);
        }

        let days = averages.len();
        let (overall_avg, overall_avg_ev) = if days == 0 {
            (None, None)
        } else {
            let avg_sum: f64 = averages.iter().flatten().sum();
            let ev_sum: f64 = evolutions.iter().sum();
            (Some(avg_sum / days as f64), Some(ev_sum / days as f64))
        };

        Summary {
            daily: table,
            overall_avg,
            overall_avg_ev,
        }
    }

    /// Percentage change of each value from the last present value before it.
    ///
    /// The first entry, missing values and changes from zero are 0.0.
    pub fn evolution(values: &[Option<f64>]) -> Vec<f64> {
        let mut previous: Option<f64> = None;

        values
            .iter()
            .map(|current| {
                let change = match (*current, previous) {
                    (Some(curr), Some(prev)) => percent_change(curr, prev),
                    _ => None,
                };
                if current.is_some() {
                    previous = *current;
                }
                change.unwrap_or(0.0)
            })
            .collect()
    }
}

/// Percentage change from `previous` to `current`; undefined from zero
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    change.is_finite().then_some(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregateRow, Granularity};
    use chrono::{Duration, NaiveDate};

    fn daily_table(values: &[Option<f64>]) -> AggregateTable {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, average)| {
                let bucket = first + Duration::days(i as i64);
                AggregateRow {
                    bucket,
                    label: bucket.to_string(),
                    average: *average,
                    evolution: None,
                }
            })
            .collect();
        AggregateTable {
            granularity: Granularity::Day,
            rows,
        }
    }

    #[test]
    fn test_evolution_and_overall() {
        let daily = daily_table(&[Some(100.0), Some(150.0), Some(75.0)]);

        let summary = EvolutionCalculator::summarize(&daily);

        let evolutions: Vec<Option<f64>> = summary.daily.rows.iter().map(|r| r.evolution).collect();
        assert_eq!(evolutions, vec![Some(0.0), Some(50.0), Some(-50.0)]);
        assert!((summary.overall_avg.unwrap() - 108.333_333).abs() < 1e-3);
        assert_eq!(summary.overall_avg_ev, Some(0.0));
    }

    #[test]
    fn test_input_table_not_mutated() {
        let daily = daily_table(&[Some(1.0), Some(2.0)]);

        let _ = EvolutionCalculator::summarize(&daily);

        assert!(daily.rows.iter().all(|r| r.evolution.is_none()));
    }

    #[test]
    fn test_zero_previous_gives_zero() {
        assert_eq!(
            EvolutionCalculator::evolution(&[Some(0.0), Some(10.0), Some(20.0)]),
            vec![0.0, 0.0, 100.0]
        );
    }

    #[test]
    fn test_missing_day_counts_as_zero_in_overall() {
        let daily = daily_table(&[Some(90.0), None, Some(60.0)]);

        let summary = EvolutionCalculator::summarize(&daily);

        // (90 + 60) / 3 days
        assert_eq!(summary.overall_avg, Some(50.0));
        // Missing day has no change; the next day compares against 90
        let evolutions: Vec<f64> = summary.daily.rows.iter().filter_map(|r| r.evolution).collect();
        assert!((evolutions[2] - (-100.0 / 3.0)).abs() < 1e-9);
        assert_eq!(evolutions[1], 0.0);
        // Missing averages stay distinguishable from zero
        assert_eq!(summary.daily.rows[1].average, None);
    }

    #[test]
    fn test_empty_table() {
        let summary = EvolutionCalculator::summarize(&daily_table(&[]));
        assert_eq!(summary.overall_avg, None);
        assert_eq!(summary.overall_avg_ev, None);
    }

    #[test]
    fn test_single_day() {
        let summary = EvolutionCalculator::summarize(&daily_table(&[Some(42.0)]));
        assert_eq!(summary.overall_avg, Some(42.0));
        assert_eq!(summary.overall_avg_ev, Some(0.0));
    }
}
