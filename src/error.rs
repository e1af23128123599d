//! Error types for Vitals KPI

use thiserror::Error;

/// Errors that can occur during extraction and KPI computation
#[derive(Debug, Error)]
pub enum KpiError {
    #[error("Failed to parse export: {0}")]
    ParseError(String),

    #[error("No data found: {0}")]
    EmptyResult(String),

    #[error("Cannot convert cached value to a table: {0}")]
    ConversionError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KpiError {
    /// Stable machine-readable code for transport layers
    pub fn code(&self) -> &'static str {
        match self {
            KpiError::ParseError(_) => "PARSE_ERROR",
            KpiError::EmptyResult(_) => "EMPTY_RESULT",
            KpiError::ConversionError(_) => "CONVERSION_ERROR",
            KpiError::NotFound(_) => "NOT_FOUND",
            KpiError::InsufficientData(_) => "INSUFFICIENT_DATA",
            KpiError::JsonError(_) => "JSON_ERROR",
            KpiError::CsvError(_) => "CSV_ERROR",
            KpiError::IoError(_) => "IO_ERROR",
        }
    }

    /// Whether the failure was caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KpiError::ParseError(_)
                | KpiError::EmptyResult(_)
                | KpiError::NotFound(_)
                | KpiError::InsufficientData(_)
                | KpiError::JsonError(_)
                | KpiError::CsvError(_)
        )
    }
}
