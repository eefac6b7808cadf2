// src/error.rs
use crate::core::provider::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckerError {
    /// A source table could not be fetched or parsed; synonym checking is off.
    #[error("{table} table unavailable: {reason}")]
    DataUnavailable { table: Table, reason: String },

    #[error("answer contains characters outside the target script: {0:?}")]
    InvalidAnswerInput(String),

    /// Zero or several subjects carry exactly the question's meanings.
    #[error("expected exactly one subject for {primary:?}, found {matches}")]
    DataConsistency { primary: String, matches: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CheckerError> = std::result::Result<T, E>;
