//! Pipeline configuration
//!
//! Settings are plain serde structs so they can be loaded from a JSON file and
//! saved back, the same way persisted state is handled elsewhere in the crate.

use crate::types::WeekLabel;
use serde::{Deserialize, Serialize};

/// Default element tag collected from XML exports
pub const DEFAULT_RECORD_TAG: &str = "Record";

/// Default maximum element nesting accepted by the XML reader
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Label format for weekly buckets
    pub week_label: WeekLabel,
    /// Element tag treated as one record
    pub record_tag: String,
    /// Maximum element nesting depth in XML input
    pub max_depth: usize,
    pub forecast: ForecastConfig,
    pub ecg: EcgConfig,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            week_label: WeekLabel::default(),
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            forecast: ForecastConfig::default(),
            ecg: EcgConfig::default(),
        }
    }
}

impl KpiConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Heart-rate forecasting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Hourly points handed to the model as history
    pub context_length: usize,
    /// Hourly points held out and predicted
    pub horizon: usize,
    /// Season length (hours) of the seasonal-naive model built by
    /// `KpiProcessor::forecast_default` and the CLI
    pub season: usize,
    /// Widest first-to-last span the hourly series may cover (hours)
    pub max_span_hours: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            context_length: 1536,
            horizon: 96,
            season: 24,
            // Ten years
            max_span_hours: 87_660,
        }
    }
}

/// ECG recording settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    pub sampling_rate_hz: u32,
    /// Recording length the time axis is spread over
    pub duration_seconds: f64,
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 512,
            duration_seconds: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = KpiConfig::from_json(r#"{"week_label": "range", "forecast": {"horizon": 24}}"#)
            .unwrap();

        assert_eq!(config.week_label, WeekLabel::Range);
        assert_eq!(config.forecast.horizon, 24);
        assert_eq!(config.forecast.context_length, 1536);
        assert_eq!(config.record_tag, "Record");
        assert_eq!(config.ecg.sampling_rate_hz, 512);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = KpiConfig::default();
        let loaded = KpiConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(config, loaded);
    }
}
