//! Error types for engine construction and the request contract
//!
//! The numeric core never fails: bad dates, unparseable numbers and missed
//! lookups degrade to sentinel values. Errors here cover loading the static
//! dataset, building the formula graph and decoding requests.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("Invalid dataset entry at {location}: {reason}")]
    InvalidDataset { location: String, reason: String },

    #[error("Age parameter table out of order: age {age} (row {row}) follows age {previous}")]
    AgeTableOrder { previous: u32, age: u32, row: u32 },

    #[error("Formula graph contains a cycle through {0:?}")]
    CycleDetected(Vec<String>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
