//! ECG recording loader
//!
//! Wearable ECG exports carry a free-form header followed by one voltage
//! sample per line. The samples start at the first line made only of digits.

use crate::config::EcgConfig;
use crate::error::KpiError;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// One voltage sample on the synthesized time axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcgSample {
    /// Seconds since the start of the recording
    pub time: f64,
    pub signal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgRecording {
    pub sampling_rate_hz: u32,
    pub samples: Vec<EcgSample>,
}

impl EcgRecording {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn signal(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.signal).collect()
    }
}

/// Load an ECG recording from a CSV export
pub fn load_ecg<R: BufRead>(reader: R, config: &EcgConfig) -> Result<EcgRecording, KpiError> {
    let mut values = Vec::new();
    let mut started = false;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if !started {
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            started = true;
        }
        if trimmed.is_empty() {
            continue;
        }

        let value: f64 = trimmed.parse().map_err(|_| {
            KpiError::ParseError(format!(
                "line {}: '{trimmed}' is not an ECG sample",
                index + 1
            ))
        })?;
        values.push(value);
    }

    if values.is_empty() {
        return Err(KpiError::EmptyResult(
            "no ECG samples found".to_string(),
        ));
    }

    tracing::debug!(samples = values.len(), "loaded ECG recording");

    let times = linspace(0.0, config.duration_seconds, values.len());
    Ok(EcgRecording {
        sampling_rate_hz: config.sampling_rate_hz,
        samples: times
            .into_iter()
            .zip(values)
            .map(|(time, signal)| EcgSample { time, signal })
            .collect(),
    })
}

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
