//! Heart-rate forecasting
//!
//! Heart-rate records are averaged per minute, resampled to a contiguous
//! hourly series, and split into a context window and a held-out horizon.
//! The model itself sits behind [`ForecastModel`]; a seasonal-naive model is
//! bundled so the flow works without an external service.

use crate::config::ForecastConfig;
use crate::error::KpiError;
use crate::metrics::Metric;
use crate::normalizer::Normalizer;
use crate::types::Table;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp format of hourly points
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Mean heart rate within one minute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinutePoint {
    pub minute: DateTime<Utc>,
    pub avg_bpm: f64,
}

/// One point of the hourly series handed to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub target: f64,
}

/// Predictions over the held-out horizon and their error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Mean absolute percentage error against the holdout, in percent
    pub mape: f64,
    pub context_points: usize,
    pub forecast: Vec<ForecastPoint>,
}

/// Time-series model producing `horizon` hourly predictions
pub trait ForecastModel {
    fn forecast(&self, history: &[ForecastPoint], horizon: usize) -> Result<Vec<f64>, KpiError>;
}

/// Repeats the last full season of the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalNaiveModel {
    pub period: usize,
}

impl Default for SeasonalNaiveModel {
    fn default() -> Self {
        Self { period: 24 }
    }
}

impl SeasonalNaiveModel {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl ForecastModel for SeasonalNaiveModel {
    fn forecast(&self, history: &[ForecastPoint], horizon: usize) -> Result<Vec<f64>, KpiError> {
        if history.is_empty() {
            return Err(KpiError::InsufficientData(
                "forecast history is empty".to_string(),
            ));
        }

        let period = self.period.clamp(1, history.len());
        let season = &history[history.len() - period..];

        Ok((0..horizon).map(|i| season[i % period].target).collect())
    }
}

/// Heart-rate samples averaged per start minute, in time order
pub fn minute_series(table: &Table) -> Vec<MinutePoint> {
    let mut minutes: BTreeMap<i64, (f64, usize)> = BTreeMap::new();

    for sample in Normalizer::filter_and_normalize(table, Metric::HeartRate.identifier()) {
        let (Some(start), Some(value)) = (sample.start, sample.value) else {
            continue;
        };
        let minute = start.timestamp().div_euclid(60) * 60;
        let entry = minutes.entry(minute).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    minutes
        .into_iter()
        .filter_map(|(minute, (sum, count))| {
            Some(MinutePoint {
                minute: Utc.timestamp_opt(minute, 0).single()?,
                avg_bpm: sum / count as f64,
            })
        })
        .collect()
}

/// Contiguous hourly means with empty hours forward-filled.
///
/// `minutes` must be in time order, as returned by [`minute_series`]. A span
/// wider than `max_span_hours` is `InsufficientData`.
pub fn hourly_series(
    minutes: &[MinutePoint],
    max_span_hours: usize,
) -> Result<Vec<ForecastPoint>, KpiError> {
    let (Some(first), Some(last)) = (minutes.first(), minutes.last()) else {
        return Ok(Vec::new());
    };

    let hour_of = |t: &DateTime<Utc>| t.timestamp().div_euclid(3600);
    let first_hour = hour_of(&first.minute);
    let last_hour = hour_of(&last.minute);

    let span = last_hour.saturating_sub(first_hour).unsigned_abs();
    if span > max_span_hours as u64 {
        return Err(KpiError::InsufficientData(format!(
            "heart-rate records span {span} hours, more than the {max_span_hours} hour limit"
        )));
    }

    let mut bins: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for point in minutes {
        let entry = bins.entry(hour_of(&point.minute)).or_insert((0.0, 0));
        entry.0 += point.avg_bpm;
        entry.1 += 1;
    }

    let mut series = Vec::new();
    let mut previous = None;
    for hour in first_hour..=last_hour {
        let target = match bins.get(&hour) {
            Some((sum, count)) => Some(sum / *count as f64),
            None => previous,
        };
        previous = target;

        if let (Some(target), Some(date)) = (target, Utc.timestamp_opt(hour * 3600, 0).single()) {
            series.push(ForecastPoint {
                date: date.format(DATE_FORMAT).to_string(),
                target,
            });
        }
    }

    Ok(series)
}

/// Forecast the held-out horizon of a table's heart-rate series
pub fn forecast_heart_rate(
    table: &Table,
    model: &dyn ForecastModel,
    config: &ForecastConfig,
) -> Result<ForecastResult, KpiError> {
    let series = hourly_series(&minute_series(table), config.max_span_hours)?;
    let horizon = config.horizon;

    if series.len() < horizon + 1 {
        return Err(KpiError::InsufficientData(format!(
            "{} hourly points, need at least {}",
            series.len(),
            horizon + 1
        )));
    }

    let split = series.len() - horizon;
    let context = &series[split.saturating_sub(config.context_length)..split];
    let holdout = &series[split..];

    tracing::debug!(
        context = context.len(),
        horizon,
        "forecasting heart rate"
    );

    let predictions = model.forecast(context, horizon)?;
    if predictions.len() != horizon {
        return Err(KpiError::ConversionError(format!(
            "model returned {} points, expected {horizon}",
            predictions.len()
        )));
    }

    let actual: Vec<f64> = holdout.iter().map(|p| p.target).collect();
    let mape = mean_absolute_percentage_error(&actual, &predictions);

    let forecast = holdout
        .iter()
        .zip(predictions)
        .map(|(point, target)| ForecastPoint {
            date: point.date.clone(),
            target,
        })
        .collect();

    Ok(ForecastResult {
        mape,
        context_points: context.len(),
        forecast,
    })
}

/// Mean of `|a - p| / max(|a|, eps)`, in percent
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return 0.0;
    }

    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum();

    total / n as f64 * 100.0
}
