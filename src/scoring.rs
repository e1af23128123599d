//! Health-status scoring
//!
//! Classifies the average of selected metrics into qualitative bands:
//! step count (activity), heart rate, active energy and blood oxygen.
//! The thresholds are fixed; free-text medical analysis is not produced here.

use crate::aggregator::mean_present;
use crate::metrics::Metric;
use crate::normalizer::{TYPE_FIELD, VALUE_FIELD};
use crate::types::{FieldValue, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Qualitative health-status band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    // Activity
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    HighlyActive,
    // Heart rate and oxygen
    Critical,
    Ideal,
    Normal,
    High,
    Excellent,
    // Energy and oxygen
    Low,
    Moderate,
    Active,
    Intense,
}

impl ScoreBand {
    /// Band for an average value of a scored metric.
    ///
    /// Oxygen saturation is expected as a percentage (0-100).
    pub fn classify(metric: Metric, value: f64) -> Option<ScoreBand> {
        let band = match metric {
            Metric::StepCount => match value {
                v if v < 3000.0 => ScoreBand::Sedentary,
                v if v < 7000.0 => ScoreBand::LightlyActive,
                v if v < 10000.0 => ScoreBand::ModeratelyActive,
                _ => ScoreBand::HighlyActive,
            },
            Metric::HeartRate => match value {
                v if v < 50.0 => ScoreBand::Critical,
                v if v < 70.0 => ScoreBand::Ideal,
                v if v < 90.0 => ScoreBand::Normal,
                _ => ScoreBand::High,
            },
            Metric::ActiveEnergyBurned => match value {
                v if v < 200.0 => ScoreBand::Low,
                v if v < 500.0 => ScoreBand::Moderate,
                v if v < 800.0 => ScoreBand::Active,
                _ => ScoreBand::Intense,
            },
            Metric::OxygenSaturation => match value {
                v if v < 90.0 => ScoreBand::Critical,
                v if v < 94.0 => ScoreBand::Low,
                v if v < 97.0 => ScoreBand::Normal,
                _ => ScoreBand::Excellent,
            },
            _ => return None,
        };
        Some(band)
    }

    /// Guidance attached to a band for a metric
    pub fn advice(&self, metric: Metric) -> &'static str {
        match (metric, self) {
            (Metric::StepCount, ScoreBand::Sedentary) => {
                "Try to incorporate more movement into your daily routine."
            }
            (Metric::StepCount, ScoreBand::LightlyActive) => {
                "Good start, but aim for at least 7,000 steps per day."
            }
            (Metric::StepCount, ScoreBand::ModeratelyActive) => {
                "Well done, you are close to the recommended goal."
            }
            (Metric::StepCount, _) => "Excellent, you maintain a great level of physical activity.",
            (Metric::HeartRate, ScoreBand::Critical) => {
                "Your heart rate is too low, consult a doctor."
            }
            (Metric::HeartRate, ScoreBand::Ideal) => {
                "Your heart rate is optimal and reflects good physical health."
            }
            (Metric::HeartRate, ScoreBand::Normal) => "Your heart rate is within the average range.",
            (Metric::HeartRate, _) => "Consult a healthcare professional.",
            (Metric::ActiveEnergyBurned, ScoreBand::Low) => {
                "Try to increase your daily physical activity."
            }
            (Metric::ActiveEnergyBurned, ScoreBand::Moderate) => {
                "Good effort, keep moving regularly."
            }
            (Metric::ActiveEnergyBurned, ScoreBand::Active) => {
                "Very good, you are maintaining a good fitness level."
            }
            (Metric::ActiveEnergyBurned, _) => "Excellent, you reached a high level of activity.",
            (Metric::OxygenSaturation, ScoreBand::Critical) => {
                "Your SpO2 is dangerously low, seek medical attention immediately."
            }
            (Metric::OxygenSaturation, ScoreBand::Low) => {
                "Your SpO2 is below normal, monitor your condition closely."
            }
            (Metric::OxygenSaturation, ScoreBand::Normal) => {
                "Your oxygen saturation is within the expected range."
            }
            (Metric::OxygenSaturation, _) => {
                "Your respiratory and circulatory functions are optimal."
            }
            _ => "",
        }
    }
}

/// Score of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    pub metric: Metric,
    /// Average in display units (SpO2 as a percentage)
    pub average: f64,
    pub unit: String,
    pub band: ScoreBand,
    pub summary: String,
}

/// Scores for every scored metric present in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub activity: Option<MetricScore>,
    pub heart: Option<MetricScore>,
    pub energy: Option<MetricScore>,
    pub oxygen: Option<MetricScore>,
}

/// Scorer over extracted tables
pub struct HealthScorer;

impl HealthScorer {
    /// Score step count, heart rate, active energy and oxygen saturation
    pub fn score(table: &Table) -> ScoreReport {
        ScoreReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            activity: Self::score_metric(table, Metric::StepCount),
            heart: Self::score_metric(table, Metric::HeartRate),
            energy: Self::score_metric(table, Metric::ActiveEnergyBurned),
            oxygen: Self::score_metric(table, Metric::OxygenSaturation),
        }
    }

    /// Score one metric; `None` when it is not scored or has no numeric rows
    pub fn score_metric(table: &Table, metric: Metric) -> Option<MetricScore> {
        let Some(raw_average) = metric_average(table, metric.identifier()) else {
            tracing::debug!(%metric, "no numeric rows to score");
            return None;
        };

        let (average, unit) = match metric {
            Metric::OxygenSaturation => (raw_average * 100.0, "%"),
            Metric::HeartRate => (raw_average, "BPM"),
            Metric::ActiveEnergyBurned => (raw_average, "kcal"),
            Metric::StepCount => (raw_average, "steps"),
            _ => return None,
        };
        let band = ScoreBand::classify(metric, average)?;

        let summary = match metric {
            Metric::OxygenSaturation => format!(
                "Average oxygen saturation: {average:.2}{unit}. {}",
                band.advice(metric)
            ),
            _ => format!(
                "Average {}: {average:.0} {unit}. {}",
                metric.as_str().replace('_', " "),
                band.advice(metric)
            ),
        };

        Some(MetricScore {
            metric,
            average,
            unit: unit.to_string(),
            band,
            summary,
        })
    }
}

/// Mean `value` over every row of one type, skipping non-numeric values
pub fn metric_average(table: &Table, metric_id: &str) -> Option<f64> {
    mean_present(
        table
            .rows()
            .iter()
            .filter(|row| row.get(TYPE_FIELD).and_then(FieldValue::as_str) == Some(metric_id))
            .map(|row| row.get(VALUE_FIELD).and_then(FieldValue::as_f64)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FlatRow;

    fn table(rows: &[(Metric, &str)]) -> Table {
        Table::from_rows(
            rows.iter()
                .map(|(metric, value)| {
                    [("type", metric.identifier()), ("value", *value)]
                        .into_iter()
                        .collect::<FlatRow>()
                })
                .collect(),
        )
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(ScoreBand::classify(Metric::StepCount, 2999.0), Some(ScoreBand::Sedentary));
        assert_eq!(ScoreBand::classify(Metric::StepCount, 3000.0), Some(ScoreBand::LightlyActive));
        assert_eq!(ScoreBand::classify(Metric::StepCount, 10000.0), Some(ScoreBand::HighlyActive));
        assert_eq!(ScoreBand::classify(Metric::HeartRate, 49.9), Some(ScoreBand::Critical));
        assert_eq!(ScoreBand::classify(Metric::HeartRate, 70.0), Some(ScoreBand::Normal));
        assert_eq!(ScoreBand::classify(Metric::HeartRate, 90.0), Some(ScoreBand::High));
        assert_eq!(ScoreBand::classify(Metric::ActiveEnergyBurned, 500.0), Some(ScoreBand::Active));
        assert_eq!(ScoreBand::classify(Metric::OxygenSaturation, 93.9), Some(ScoreBand::Low));
        assert_eq!(ScoreBand::classify(Metric::OxygenSaturation, 97.0), Some(ScoreBand::Excellent));
        assert_eq!(ScoreBand::classify(Metric::Vo2Max, 40.0), None);
    }

    #[test]
    fn test_score_report() {
        let table = table(&[
            (Metric::HeartRate, "60"),
            (Metric::HeartRate, "70"),
            (Metric::OxygenSaturation, "0.95"),
            (Metric::StepCount, "8000"),
            (Metric::StepCount, "not counted"),
        ]);

        let report = HealthScorer::score(&table);

        let heart = report.heart.unwrap();
        assert_eq!(heart.average, 65.0);
        assert_eq!(heart.band, ScoreBand::Ideal);

        let oxygen = report.oxygen.unwrap();
        assert!((oxygen.average - 95.0).abs() < 1e-9);
        assert_eq!(oxygen.band, ScoreBand::Normal);

        assert_eq!(report.activity.unwrap().band, ScoreBand::ModeratelyActive);
        assert!(report.energy.is_none());
    }

    #[test]
    fn test_summary_text() {
        let table = table(&[(Metric::ActiveEnergyBurned, "150")]);

        let score = HealthScorer::score_metric(&table, Metric::ActiveEnergyBurned).unwrap();

        assert!(score.summary.starts_with("Average active energy burned: 150 kcal."));
    }
}
