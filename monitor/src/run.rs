//! Run identity: host name, record store naming and the capture window

use crate::config::RunConfig;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use std::path::{Path, PathBuf};

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One bounded capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub duration_minutes: u32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub output_path: PathBuf,
}

impl Run {
    pub fn begin(config: &RunConfig, start_time: NaiveDateTime) -> Self {
        Self {
            duration_minutes: config.duration_minutes,
            start_time,
            end_time: start_time + ChronoDuration::minutes(i64::from(config.duration_minutes)),
            output_path: config.output_path.clone(),
        }
    }
}

pub fn host_name() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return "unknown".to_string();
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..len]).trim().to_string();
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name
    }
}

/// Keeps host names usable as a file name component.
fn sanitize(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// `<dir>/hostmon-<host>-<start>.csv`, with `-N` appended until the name is free.
pub fn record_store_path(dir: &Path, host: &str, started: NaiveDateTime) -> PathBuf {
    let stem = format!(
        "hostmon-{}-{}",
        sanitize(host),
        started.format(FILE_TIMESTAMP_FORMAT)
    );
    let mut candidate = dir.join(format!("{}.csv", stem));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.csv", stem, n));
        n += 1;
    }
    candidate
}
