//! Error types for cadence-engine operations.
//!
//! Errors only arise at the boundary: parsing persisted records and
//! timezones. Expansion and the edit operators are total over well-formed
//! input and never return an error.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid exception at {date}: {reason}")]
    InvalidException { date: NaiveDate, reason: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CadenceError>;
