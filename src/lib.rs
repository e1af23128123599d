//! Vitals KPI - Health-export extraction and time-bucketed KPI engine
//!
//! Vitals KPI turns wearable health exports into per-metric indicators through
//! a deterministic pipeline: XML streaming → record flattening → filtering and
//! normalization → daily/weekly/monthly aggregation → evolution → encoding.
//!
//! ## Modules
//!
//! - **KPI Pipeline**: Extract records and compute per-metric averages and evolution
//! - **Scoring**: Classify metric averages into health-status bands
//! - **Forecast**: Prepare hourly heart-rate series for a forecasting model
//! - **ECG**: Load raw ECG recordings

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod ecg;
pub mod encoder;
pub mod error;
pub mod evolution;
pub mod flatten;
pub mod forecast;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod schema;
pub mod scoring;
pub mod types;

pub use config::KpiConfig;
pub use encoder::KpiEncoder;
pub use error::KpiError;
pub use metrics::Metric;
pub use pipeline::{compute_kpis, compute_kpis_with, extract_xml, KpiProcessor};
pub use types::{AggregateTable, FieldValue, FlatRow, Granularity, KpiResult, RawRecord, Table};

// Scoring and forecasting exports
pub use forecast::{ForecastModel, ForecastResult, SeasonalNaiveModel};
pub use scoring::{HealthScorer, ScoreReport};

/// Crate version reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "vitals-kpi";
