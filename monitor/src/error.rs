//! Error types for capture and rendering

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Invalid duration {input:?}: {reason}")]
    InvalidDuration { input: String, reason: String },

    #[error("Invalid sample interval: {0} seconds")]
    InvalidInterval(u32),

    #[error("Record store {path:?} contains no usable data rows")]
    EmptyRecordStore { path: PathBuf },

    #[error("Record store {path:?} has header {found:?}, expected \"timestamp,cpu,memory\"")]
    InvalidHeader { path: PathBuf, found: String },

    #[error("Failed to render chart {path:?}: {reason}")]
    Chart { path: PathBuf, reason: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// A single CPU or memory reading that could not be produced.
#[derive(Error, Debug)]
pub enum MeasurementError {
    #[error("counter unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read {source_name}: {error}")]
    Read {
        source_name: &'static str,
        error: std::io::Error,
    },

    #[error("malformed {source_name}: {reason}")]
    Malformed {
        source_name: &'static str,
        reason: String,
    },

    #[error("total memory reported as zero")]
    ZeroTotalMemory,
}

/// Why a record store row was skipped.
#[derive(Error, Debug, PartialEq)]
pub enum RowError {
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),

    #[error("unparseable timestamp {0:?}")]
    Timestamp(String),

    #[error("unparseable {field} value {value:?}")]
    Value { field: &'static str, value: String },

    #[error("{field} value {value} outside 0..=100")]
    OutOfRange { field: &'static str, value: f64 },
}
