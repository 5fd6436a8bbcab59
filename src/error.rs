//! Error types for the turnstile count pipeline.

use crate::model::StationId;
use chrono::NaiveDate;
use thiserror::Error;

/// Result type used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A daily count already exists for this key. Only the corrector may overwrite rows.
    #[error("Daily count for station {station_id} on {} already exists", .date.format("%Y/%m/%d"))]
    DuplicateKey { station_id: StationId, date: NaiveDate },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Unknown time zone '{0}'")]
    UnknownTimeZone(String),
}
