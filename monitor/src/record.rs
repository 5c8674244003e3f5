//! Record store: the per-run `timestamp,cpu,memory` CSV file

use crate::error::{MonitorError, Result, RowError};
use chrono::NaiveDateTime;
use csv::StringRecord;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const HEADER: [&str; 3] = ["timestamp", "cpu", "memory"];
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One observation of host utilization.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl Sample {
    pub fn to_record(&self) -> [String; 3] {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", self.cpu_percent),
            format!("{:.2}", self.memory_percent),
        ]
    }

    pub fn from_record(record: &StringRecord) -> std::result::Result<Self, RowError> {
        if record.len() != HEADER.len() {
            return Err(RowError::FieldCount(record.len()));
        }
        let raw_ts = record[0].trim();
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT)
            .map_err(|_| RowError::Timestamp(raw_ts.to_string()))?;
        Ok(Sample {
            timestamp,
            cpu_percent: parse_percent("cpu", &record[1])?,
            memory_percent: parse_percent("memory", &record[2])?,
        })
    }
}

fn parse_percent(field: &'static str, raw: &str) -> std::result::Result<f64, RowError> {
    let value: f64 = raw.trim().parse().map_err(|_| RowError::Value {
        field,
        value: raw.to_string(),
    })?;
    if !(0.0..=100.0).contains(&value) {
        return Err(RowError::OutOfRange { field, value });
    }
    Ok(value)
}

/// Append-only writer. Every record is flushed and synced before `append`
/// returns, so an interrupted run leaves only whole lines behind.
pub struct RecordWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl RecordWriter {
    /// Creates a fresh store and writes the header. Fails if `path` exists.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(HEADER)?;
        writer.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        self.writer.write_record(sample.to_record())?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Samples read back from a store, plus how many rows were rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRecords {
    pub samples: Vec<Sample>,
    pub skipped: usize,
}

/// Reads a record store. Malformed rows are skipped with a warning; a
/// missing or wrong header is an error.
pub fn read_records(path: &Path) -> Result<LoadedRecords> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let header = reader.headers()?.clone();
    if header.iter().map(str::trim).ne(HEADER.iter().copied()) {
        return Err(MonitorError::InvalidHeader {
            path: path.to_path_buf(),
            found: header.iter().collect::<Vec<_>>().join(","),
        });
    }

    let mut loaded = LoadedRecords::default();
    for (index, result) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        let line = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable row at line {} of {:?}: {}", line, path, e);
                loaded.skipped += 1;
                continue;
            }
        };
        match Sample::from_record(&record) {
            Ok(sample) => loaded.samples.push(sample),
            Err(e) => {
                warn!("Skipping malformed row at line {} of {:?}: {}", line, path, e);
                loaded.skipped += 1;
            }
        }
    }
    Ok(loaded)
}
