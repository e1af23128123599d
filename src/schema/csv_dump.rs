//! CSV record dumps
//!
//! A header row names the columns; every following row becomes one table row
//! with text cells. Empty cells are `Null`.

use crate::error::KpiError;
use crate::types::{FieldValue, FlatRow, Table};
use std::io::Read;

/// Read a CSV record dump into a table, keeping header and row order
pub fn read_csv_table<R: Read>(input: R) -> Result<Table, KpiError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: FlatRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::from(cell)
                };
                (header.as_str(), value)
            })
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(KpiError::EmptyResult("no rows found in CSV input".to_string()));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "read CSV table");
    Ok(Table::with_columns(headers, rows))
}
