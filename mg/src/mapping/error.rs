//! Mapping error types

use thiserror::Error;

/// Errors that can occur while reading a mapping table
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Malformed mapping row at line {line}: expected 5 fields, found {fields}")]
    MalformedRow { line: u64, fields: usize },

    #[error("No mapping rows found")]
    NoMappingRows,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
