use super::{memory_percent, Measurement, MetricsProvider};
use crate::error::MeasurementError;
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Shortest span a CPU reading is measured over.
pub const MIN_CPU_WINDOW: Duration = Duration::from_secs(1);

/// Aggregate jiffies from the `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Physical memory figures from /proc/meminfo, in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
}

/// Parses the aggregate `cpu ` line of /proc/stat.
///
/// idle and iowait count as idle; guest time is already folded into user
/// and nice by the kernel, so only the first eight columns are summed.
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes, MeasurementError> {
    let line = stat
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| MeasurementError::Malformed {
            source_name: "/proc/stat",
            reason: "no aggregate cpu line".to_string(),
        })?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| MeasurementError::Malformed {
            source_name: "/proc/stat",
            reason: e.to_string(),
        })?;
    if fields.len() < 4 {
        return Err(MeasurementError::Malformed {
            source_name: "/proc/stat",
            reason: format!("expected at least 4 cpu columns, found {}", fields.len()),
        });
    }

    let total: u64 = fields.iter().sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        busy: total.saturating_sub(idle),
        total,
    })
}

pub fn parse_meminfo(meminfo: &str) -> Result<MemInfo, MeasurementError> {
    let mut total_kb = None;
    let mut free_kb = None;
    for line in meminfo.lines() {
        let mut parts = line.split_whitespace();
        let slot = match parts.next() {
            Some("MemTotal:") => &mut total_kb,
            Some("MemFree:") => &mut free_kb,
            _ => continue,
        };
        *slot = parts.next().and_then(|v| v.parse::<u64>().ok());
    }

    match (total_kb, free_kb) {
        (Some(total_kb), Some(free_kb)) => Ok(MemInfo { total_kb, free_kb }),
        _ => Err(MeasurementError::Malformed {
            source_name: "/proc/meminfo",
            reason: "missing MemTotal or MemFree".to_string(),
        }),
    }
}

pub struct LinuxMetricsProvider {
    proc_root: PathBuf,
    last_cpu: Option<(CpuTimes, Instant)>,
    min_window: Duration,
}

impl LinuxMetricsProvider {
    pub fn new() -> Self {
        Self::with_proc_root("/proc")
    }

    /// Reads from an alternate procfs mount (used by tests).
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        let mut provider = Self {
            proc_root: proc_root.into(),
            last_cpu: None,
            min_window: MIN_CPU_WINDOW,
        };
        // Baseline so the first sample reports a delta rather than the since-boot average
        provider.last_cpu = provider.read_cpu_times().ok().map(|t| (t, Instant::now()));
        provider
    }

    pub fn with_min_window(mut self, min_window: Duration) -> Self {
        self.min_window = min_window;
        self
    }

    fn read(&self, name: &'static str) -> Result<String, MeasurementError> {
        fs::read_to_string(self.proc_root.join(name)).map_err(|error| MeasurementError::Read {
            source_name: name,
            error,
        })
    }

    fn read_cpu_times(&self) -> Result<CpuTimes, MeasurementError> {
        parse_cpu_times(&self.read("stat")?)
    }
}

impl Default for LinuxMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for LinuxMetricsProvider {
    /// Blocks until the baseline is at least `min_window` old, so a reading
    /// taken right after construction still spans real CPU time.
    fn sample_cpu(&mut self) -> Measurement {
        let (previous, taken) = match self.last_cpu {
            Some(baseline) => baseline,
            None => (self.read_cpu_times()?, Instant::now()),
        };
        let age = taken.elapsed();
        if age < self.min_window {
            thread::sleep(self.min_window - age);
        }
        let now = self.read_cpu_times()?;
        self.last_cpu = Some((now, Instant::now()));

        let total_delta = now.total.saturating_sub(previous.total);
        if total_delta == 0 {
            return Err(MeasurementError::Unavailable(
                "no cpu time elapsed since previous sample".to_string(),
            ));
        }
        let busy_delta = now.busy.saturating_sub(previous.busy);
        Ok(busy_delta as f64 / total_delta as f64 * 100.0)
    }

    fn sample_memory(&mut self) -> Measurement {
        let info = parse_meminfo(&self.read("meminfo")?)?;
        memory_percent(info.total_kb, info.free_kb)
    }
}
