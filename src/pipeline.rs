//! Pipeline orchestration
//!
//! This module provides the public API for Vitals KPI.
//! It orchestrates extraction and the per-metric KPI computation.

use crate::aggregator::PeriodAggregator;
use crate::cache::TableCache;
use crate::config::KpiConfig;
use crate::error::KpiError;
use crate::evolution::EvolutionCalculator;
use crate::flatten::TableExtractor;
use crate::forecast::{self, ForecastModel, ForecastResult, SeasonalNaiveModel};
use crate::metrics::Metric;
use crate::normalizer::Normalizer;
use crate::schema::{read_csv_table, CachedValue, XmlExportReader};
use crate::scoring::{HealthScorer, ScoreReport};
use crate::types::{KpiResult, Table};
use std::io::{BufRead, Read};
use std::sync::Arc;

/// Parse an XML export and extract its record table.
///
/// Pipeline stages:
/// 1. XmlExportReader - Stream records out of the document
/// 2. RecordFlattener - Flatten each record
/// 3. TableExtractor - Assemble rows into a table
pub fn extract_xml<R: BufRead>(input: R, config: &KpiConfig) -> Result<Table, KpiError> {
    let records = XmlExportReader::from_config(config).read_records(input)?;
    TableExtractor::extract(&records)
}

/// Compute the KPIs of one metric with default settings.
///
/// # Example
/// ```ignore
/// let kpis = compute_kpis(&table, "HKQuantityTypeIdentifierHeartRate")?;
/// println!("{:?}", kpis.overall_avg);
/// ```
pub fn compute_kpis(table: &Table, metric_id: &str) -> Result<KpiResult, KpiError> {
    compute_kpis_with(table, metric_id, &KpiConfig::default())
}

/// Compute the KPIs of one metric.
///
/// Pipeline stages:
/// 1. Normalizer - Filter rows by identifier and parse dates and values
/// 2. PeriodAggregator - Daily, weekly and monthly averages
/// 3. EvolutionCalculator - Overall average and evolution
///
/// Fails with [`KpiError::EmptyResult`] when no row matches `metric_id`.
pub fn compute_kpis_with(
    table: &Table,
    metric_id: &str,
    config: &KpiConfig,
) -> Result<KpiResult, KpiError> {
    let samples = Normalizer::filter_and_normalize(table, metric_id);

    if samples.is_empty() {
        return Err(KpiError::EmptyResult(format!(
            "no records of type {metric_id}"
        )));
    }

    let (daily, weekly_avg, monthly_avg) =
        PeriodAggregator::new(config.week_label).aggregate(&samples);
    let summary = EvolutionCalculator::summarize(&daily);

    tracing::debug!(
        metric = metric_id,
        samples = samples.len(),
        days = summary.daily.len(),
        "computed KPIs"
    );

    Ok(KpiResult {
        metric: metric_id.to_string(),
        sample_count: samples.len(),
        daily_avg: summary.daily,
        weekly_avg,
        monthly_avg,
        overall_avg: summary.overall_avg,
        overall_avg_ev: summary.overall_avg_ev,
    })
}

/// Heart rate KPIs
pub fn heart_rate_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::HeartRate.identifier())
}

/// Heart-rate variability (SDNN) KPIs
pub fn heart_rate_variability_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::HeartRateVariability.identifier())
}

/// Blood oxygen saturation KPIs
pub fn oxygen_saturation_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::OxygenSaturation.identifier())
}

/// Respiratory rate KPIs
pub fn respiratory_rate_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::RespiratoryRate.identifier())
}

/// Active energy burned KPIs
pub fn active_energy_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::ActiveEnergyBurned.identifier())
}

/// VO2Max KPIs
pub fn vo2max_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::Vo2Max.identifier())
}

/// Step count KPIs
pub fn step_count_kpis(table: &Table) -> Result<KpiResult, KpiError> {
    compute_kpis(table, Metric::StepCount.identifier())
}

/// Stateful processor holding extracted tables by file name.
///
/// Use this when one uploaded export serves several metric requests.
#[derive(Debug, Default)]
pub struct KpiProcessor {
    cache: TableCache,
    config: KpiConfig,
}

impl KpiProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: KpiConfig) -> Self {
        Self {
            cache: TableCache::new(),
            config,
        }
    }

    pub fn config(&self) -> &KpiConfig {
        &self.config
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// Extract an XML export and cache its table under `name`
    pub fn ingest_xml<R: BufRead>(&self, name: &str, input: R) -> Result<Arc<Table>, KpiError> {
        let table = extract_xml(input, &self.config)?;
        Ok(self.cache.put(name, table))
    }

    /// Read a CSV record dump and cache its table under `name`
    pub fn ingest_csv<R: Read>(&self, name: &str, input: R) -> Result<Arc<Table>, KpiError> {
        let table = read_csv_table(input)?;
        Ok(self.cache.put(name, table))
    }

    /// Reshape a structured value into a table and cache it under `name`
    pub fn ingest_cached(&self, name: &str, value: CachedValue) -> Result<Arc<Table>, KpiError> {
        let table = value.into_table()?;
        Ok(self.cache.put(name, table))
    }

    /// Fetch a previously ingested table
    pub fn table(&self, name: &str) -> Result<Arc<Table>, KpiError> {
        self.cache.get(name).ok_or_else(|| {
            KpiError::NotFound(format!("'{name}' has not been ingested"))
        })
    }

    /// KPIs of one metric for a cached table
    pub fn kpis(&self, name: &str, metric_id: &str) -> Result<KpiResult, KpiError> {
        let table = self.table(name)?;
        compute_kpis_with(&table, metric_id, &self.config)
    }

    /// Health-status scores for a cached table
    pub fn scores(&self, name: &str) -> Result<ScoreReport, KpiError> {
        let table = self.table(name)?;
        if table.is_empty() {
            return Err(KpiError::EmptyResult(format!("'{name}' holds no records")));
        }
        Ok(HealthScorer::score(&table))
    }

    /// Heart-rate forecast for a cached table
    pub fn forecast(
        &self,
        name: &str,
        model: &dyn ForecastModel,
    ) -> Result<ForecastResult, KpiError> {
        let table = self.table(name)?;
        forecast::forecast_heart_rate(&table, model, &self.config.forecast)
    }

    /// Heart-rate forecast using the seasonal-naive model with the configured season
    pub fn forecast_default(&self, name: &str) -> Result<ForecastResult, KpiError> {
        let model = SeasonalNaiveModel::new(self.config.forecast.season);
        self.forecast(name, &model)
    }

    /// Drop one cached table; returns whether it existed
    pub fn evict(&self, name: &str) -> bool {
        self.cache.remove(name).is_some()
    }

    /// Drop every cached table
    pub fn clear(&self) {
        self.cache.clear();
    }
}
