//! Known health metric identifiers
//!
//! The aggregation core accepts any identifier string; this enum names the
//! quantity types the bundled services and CLI know about.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physiological signal recorded in a health export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    HeartRateVariability,
    OxygenSaturation,
    RespiratoryRate,
    ActiveEnergyBurned,
    Vo2Max,
    StepCount,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::HeartRate,
        Metric::HeartRateVariability,
        Metric::OxygenSaturation,
        Metric::RespiratoryRate,
        Metric::ActiveEnergyBurned,
        Metric::Vo2Max,
        Metric::StepCount,
    ];

    /// Value of the `type` field for this metric
    pub fn identifier(&self) -> &'static str {
        match self {
            Metric::HeartRate => "HKQuantityTypeIdentifierHeartRate",
            Metric::HeartRateVariability => "HKQuantityTypeIdentifierHeartRateVariabilitySDNN",
            Metric::OxygenSaturation => "HKQuantityTypeIdentifierOxygenSaturation",
            Metric::RespiratoryRate => "HKQuantityTypeIdentifierRespiratoryRate",
            Metric::ActiveEnergyBurned => "HKQuantityTypeIdentifierActiveEnergyBurned",
            Metric::Vo2Max => "HKQuantityTypeIdentifierVO2Max",
            Metric::StepCount => "HKQuantityTypeIdentifierStepCount",
        }
    }

    /// Short name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::HeartRateVariability => "heart_rate_variability",
            Metric::OxygenSaturation => "oxygen_saturation",
            Metric::RespiratoryRate => "respiratory_rate",
            Metric::ActiveEnergyBurned => "active_energy_burned",
            Metric::Vo2Max => "vo2_max",
            Metric::StepCount => "step_count",
        }
    }

    /// Reverse lookup from a `type` field value
    pub fn from_identifier(identifier: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.identifier() == identifier)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "heart_rate" | "hr" => Ok(Metric::HeartRate),
            "heart_rate_variability" | "hrv" => Ok(Metric::HeartRateVariability),
            "oxygen_saturation" | "spo2" | "oxygen" => Ok(Metric::OxygenSaturation),
            "respiratory_rate" | "respiratory" => Ok(Metric::RespiratoryRate),
            "active_energy_burned" | "energy" => Ok(Metric::ActiveEnergyBurned),
            "vo2_max" | "vo2max" => Ok(Metric::Vo2Max),
            "step_count" | "steps" => Ok(Metric::StepCount),
            _ => Metric::from_identifier(s.trim()).ok_or_else(|| format!("unknown metric: {s}")),
        }
    }
}
