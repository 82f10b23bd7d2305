//! Error types for bitemp.
//!
//! Errors fall into two families. "Not found" errors mean the requested data
//! is absent or not alive at the requested perspective; they are expected in
//! normal operation. Invariant violations mean the transaction clock or a
//! version interval was misused and always indicate a bug in the caller or in
//! the ingested data.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BitempError>;

#[derive(Debug, Error)]
pub enum BitempError {
    /// No version was ever recorded for this patient, code and valid time.
    #[error("no such record: {key}")]
    UnknownKey { key: String },

    #[error("no version of {key} is alive at {perspective}")]
    NoAliveVersionAtPerspective {
        key: String,
        perspective: NaiveDateTime,
    },

    #[error("no version of {series} on {date} is alive at {perspective}")]
    NoAliveVersionOnDate {
        series: String,
        date: NaiveDate,
        perspective: NaiveDateTime,
    },

    /// The transaction clock did not advance for this key.
    #[error(
        "transaction time {system_from} for {key} does not advance past the last recorded {last}"
    )]
    DuplicateTransactionTime {
        key: String,
        system_from: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error("version {ordinal} of {key} was already closed at {system_to}")]
    AlreadyClosed {
        key: String,
        ordinal: usize,
        system_to: NaiveDateTime,
    },

    #[error("cannot close {key} at {system_to}: version starts at {system_from}")]
    InvalidInterval {
        key: String,
        system_from: NaiveDateTime,
        system_to: NaiveDateTime,
    },

    #[error("invalid valid-time range: {start} is after {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("database is closed")]
    DatabaseClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BitempError {
    /// True for errors that only mean "nothing to return".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BitempError::UnknownKey { .. }
                | BitempError::NoAliveVersionAtPerspective { .. }
                | BitempError::NoAliveVersionOnDate { .. }
        )
    }

    /// True for violations of the transaction-time invariants.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            BitempError::DuplicateTransactionTime { .. }
                | BitempError::AlreadyClosed { .. }
                | BitempError::InvalidInterval { .. }
        )
    }
}
