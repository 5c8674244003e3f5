//! Fixed-interval sampling loop

use crate::collector::{Measurement, MetricsProvider};
use crate::config::RunConfig;
use crate::error::Result;
use crate::record::{RecordWriter, Sample};
use crate::run::Run;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, Timelike};
use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// What a finished (or interrupted) capture produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingReport {
    pub run: Run,
    pub rows_written: u64,
    pub cpu_failures: u64,
    pub memory_failures: u64,
    pub interrupted: bool,
}

pub struct Sampler<P> {
    provider: P,
    config: RunConfig,
}

/// Clamps to 0..=100 and rounds to two decimals.
pub fn normalize_percent(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Wall-clock labels derived from one wall-clock reading plus monotonic
/// elapsed time, so clock changes (DST, NTP steps) never move them backwards.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    wall_start: NaiveDateTime,
    mono_start: Instant,
}

impl SampleClock {
    pub fn start(wall_start: NaiveDateTime) -> Self {
        Self {
            wall_start,
            mono_start: Instant::now(),
        }
    }

    pub fn wall_start(&self) -> NaiveDateTime {
        self.wall_start
    }

    pub fn now(&self) -> NaiveDateTime {
        let elapsed =
            ChronoDuration::from_std(self.mono_start.elapsed()).unwrap_or(ChronoDuration::zero());
        self.wall_start + ChronoDuration::seconds(elapsed.num_seconds())
    }
}

impl<P: MetricsProvider> Sampler<P> {
    pub fn new(provider: P, config: RunConfig) -> Self {
        Self { provider, config }
    }

    /// Reads both metrics once. A failed reading becomes 0.0 for that field only.
    pub fn take_sample(
        &mut self,
        timestamp: NaiveDateTime,
        report: &mut SamplingReport,
    ) -> Sample {
        let cpu_percent = match degrade("cpu", self.provider.sample_cpu()) {
            Some(v) => v,
            None => {
                report.cpu_failures += 1;
                0.0
            }
        };
        let memory_percent = match degrade("memory", self.provider.sample_memory()) {
            Some(v) => v,
            None => {
                report.memory_failures += 1;
                0.0
            }
        };
        Sample {
            timestamp,
            cpu_percent,
            memory_percent,
        }
    }

    /// Samples until the configured duration has elapsed or `cancel` resolves.
    ///
    /// The store is created before the first sample. The sleep between
    /// samples starts after the append, so slow readings push later samples
    /// later rather than being skipped.
    pub async fn run<F>(mut self, cancel: F) -> Result<SamplingReport>
    where
        F: Future<Output = ()>,
    {
        let mut store = RecordWriter::create(&self.config.output_path)?;
        let clock = SampleClock::start(now_seconds());
        let run = Run::begin(&self.config, clock.wall_start());
        let deadline = Instant::now() + self.config.duration();
        let interval = self.config.sample_interval();

        info!(
            "Sampling every {}s for {} minute(s) into {:?} (~{} samples, until {})",
            self.config.sample_interval_seconds,
            self.config.duration_minutes,
            store.path(),
            self.config.expected_samples(),
            run.end_time
        );

        let mut report = SamplingReport {
            run,
            rows_written: 0,
            cpu_failures: 0,
            memory_failures: 0,
            interrupted: false,
        };

        tokio::pin!(cancel);
        while Instant::now() < deadline {
            let sample = self.take_sample(clock.now(), &mut report);
            store.append(&sample)?;
            report.rows_written += 1;
            debug!(
                "Sample {}: cpu={:.2}% memory={:.2}%",
                report.rows_written, sample.cpu_percent, sample.memory_percent
            );

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut cancel => {
                    report.interrupted = true;
                    info!("Sampling interrupted after {} sample(s)", report.rows_written);
                    break;
                }
            }
        }

        if !report.interrupted {
            info!("Sampling finished with {} sample(s)", report.rows_written);
        }
        Ok(report)
    }
}

/// Registers the SIGINT handler now and returns a future that resolves on
/// the next interrupt. Ctrl-C arriving before the future is first polled is
/// still delivered to it instead of killing the process.
pub fn interrupt_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        if sigint.recv().await.is_none() {
            // Signal driver gone; never report a spurious interrupt
            std::future::pending::<()>().await;
        }
    })
}

fn degrade(field: &str, measurement: Measurement) -> Option<f64> {
    match measurement {
        Ok(value) => Some(normalize_percent(value)),
        Err(e) => {
            warn!("{} measurement failed, recording 0.0: {}", field, e);
            None
        }
    }
}
