//! Host utilization collectors (reads /proc on Linux)

mod linux;

pub use linux::{parse_cpu_times, parse_meminfo, CpuTimes, LinuxMetricsProvider, MemInfo};

use crate::error::MeasurementError;

/// Outcome of one CPU or memory reading, as a percentage.
pub type Measurement = Result<f64, MeasurementError>;

/// Source of whole-host utilization readings.
///
/// Each call is independent: a failed CPU reading says nothing about the
/// next memory reading.
pub trait MetricsProvider {
    /// Aggregate CPU utilization across all processors.
    fn sample_cpu(&mut self) -> Measurement;
    /// Physical memory in use, as a share of total.
    fn sample_memory(&mut self) -> Measurement;
}

impl<P: MetricsProvider + ?Sized> MetricsProvider for Box<P> {
    fn sample_cpu(&mut self) -> Measurement {
        (**self).sample_cpu()
    }

    fn sample_memory(&mut self) -> Measurement {
        (**self).sample_memory()
    }
}

/// `(total - free) / total * 100`, failing when `total` is zero.
pub fn memory_percent(total: u64, free: u64) -> Measurement {
    if total == 0 {
        return Err(MeasurementError::ZeroTotalMemory);
    }
    let used = total.saturating_sub(free);
    Ok(used as f64 / total as f64 * 100.0)
}
