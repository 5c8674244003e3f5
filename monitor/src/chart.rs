//! PNG line charts for a completed record store

use crate::config::ChartConfig;
use crate::error::{MonitorError, Result};
use crate::record::{read_records, Sample};
use crate::stats::SeriesStats;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Value-axis labels: 0, 10, ..., 100.
pub const Y_LABELS: usize = 11;
/// Light lines per labelled step; 1 keeps the grid at the 10-unit labels.
pub const Y_MAX_LIGHT_LINES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Cpu, Metric::Memory];

    pub fn value(self, sample: &Sample) -> f64 {
        match self {
            Metric::Cpu => sample.cpu_percent,
            Metric::Memory => sample.memory_percent,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU usage",
            Metric::Memory => "Memory usage",
        }
    }

    fn color(self) -> RGBColor {
        match self {
            Metric::Cpu => RGBColor(31, 119, 180),
            Metric::Memory => RGBColor(44, 160, 44),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub color: RGBColor,
    pub width: u32,
    pub height: u32,
    pub line_width: u32,
    pub point_size: u32,
    pub smoothing_steps: u32,
}

impl ChartStyle {
    pub fn for_metric(metric: Metric, config: &ChartConfig) -> Self {
        Self {
            color: metric.color(),
            width: config.width,
            height: config.height,
            line_width: config.line_width,
            point_size: config.point_size,
            smoothing_steps: config.smoothing_steps,
        }
    }
}

/// `<dir>/<store stem>_<metric>.png`
pub fn chart_path(store: &Path, metric: Metric) -> PathBuf {
    let stem = store
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hostmon".to_string());
    store.with_file_name(format!("{}_{}.png", stem, metric.suffix()))
}

/// Plotted points: seconds since the first sample against the metric value.
pub fn series(samples: &[Sample], metric: Metric) -> Vec<(f64, f64)> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    samples
        .iter()
        .map(|s| {
            // Rows stamped before the first one (hand-edited stores) pin to the origin
            let elapsed = (s.timestamp - first.timestamp).num_seconds().max(0) as f64;
            (elapsed, metric.value(s))
        })
        .collect()
}

fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (p2 - p0) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3)
}

/// Catmull-Rom interpolation through `points`, `steps` points per segment.
/// Values stay inside 0..=100 and the curve passes through every input point.
pub fn smooth(points: &[(f64, f64)], steps: u32) -> Vec<(f64, f64)> {
    if points.len() < 3 || steps < 2 {
        return points.to_vec();
    }
    let last = points.len() - 1;
    let mut out = Vec::with_capacity(last * steps as usize + 1);
    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];
        for step in 0..steps {
            let t = f64::from(step) / f64::from(steps);
            let x = catmull_rom(p0.0, p1.0, p2.0, p3.0, t);
            let y = catmull_rom(p0.1, p1.1, p2.1, p3.1, t).clamp(0.0, 100.0);
            out.push((x, y));
        }
    }
    out.push(points[last]);
    out
}

/// Draws one metric to `path`. The value axis is fixed at 0..100 with a
/// gridline every 10 units; the time axis is labelled with time of day.
pub fn render_chart(
    samples: &[Sample],
    metric: Metric,
    style: &ChartStyle,
    caption: &str,
    path: &Path,
) -> Result<PathBuf> {
    let chart_error = |reason: String| MonitorError::Chart {
        path: path.to_path_buf(),
        reason,
    };
    let Some(first) = samples.first() else {
        return Err(chart_error("no samples to plot".to_string()));
    };
    let points = series(samples, metric);
    draw(&points, first.timestamp, metric, style, caption, path)
        .map_err(|e| chart_error(e.to_string()))?;
    Ok(path.to_path_buf())
}

fn draw(
    points: &[(f64, f64)],
    start: NaiveDateTime,
    metric: Metric,
    style: &ChartStyle,
    caption: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_end = points.iter().map(|p| p.0).fold(1.0, f64::max);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_end, 0f64..100f64)?;

    let time_label = |x: &f64| {
        (start + ChronoDuration::seconds(x.round() as i64))
            .format("%H:%M:%S")
            .to_string()
    };
    let percent_label = |y: &f64| format!("{:.0}", y);

    chart
        .configure_mesh()
        .x_labels(points.len().clamp(2, 12))
        .y_labels(Y_LABELS)
        .y_max_light_lines(Y_MAX_LIGHT_LINES)
        .x_label_formatter(&time_label)
        .y_label_formatter(&percent_label)
        .x_label_style(
            ("sans-serif", 12)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .x_desc("Time")
        .y_desc(format!("{} (%)", metric.label()))
        .draw()?;

    chart.draw_series(LineSeries::new(
        smooth(points, style.smoothing_steps),
        style.color.stroke_width(style.line_width),
    ))?;
    if style.point_size > 0 {
        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), style.point_size, style.color.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub metric: Metric,
    pub path: PathBuf,
    pub stats: SeriesStats,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    pub charts: Vec<RenderedChart>,
    pub plotted: usize,
    pub skipped: usize,
}

pub struct ChartRenderer {
    config: ChartConfig,
}

impl ChartRenderer {
    pub fn new(config: ChartConfig) -> Self {
        Self { config }
    }

    /// Renders the CPU and memory charts next to `store`.
    ///
    /// A store with no usable rows is an error and no image is written. If
    /// either chart fails, charts already written by this call are removed
    /// so a run never ends up with only one of the pair.
    pub fn render(
        &self,
        store: &Path,
        host: &str,
        duration_minutes: Option<u32>,
    ) -> Result<RenderReport> {
        let loaded = read_records(store)?;
        if loaded.samples.is_empty() {
            return Err(MonitorError::EmptyRecordStore {
                path: store.to_path_buf(),
            });
        }
        if loaded.skipped > 0 {
            warn!("Skipped {} malformed row(s) in {:?}", loaded.skipped, store);
        }

        let mut charts: Vec<RenderedChart> = Vec::with_capacity(Metric::ALL.len());
        for metric in Metric::ALL {
            let values: Vec<f64> = loaded.samples.iter().map(|s| metric.value(s)).collect();
            let stats = SeriesStats::from_values(&values).ok_or_else(|| {
                MonitorError::EmptyRecordStore {
                    path: store.to_path_buf(),
                }
            })?;

            let caption = match duration_minutes {
                Some(minutes) => format!("{} on {} ({} min capture)", metric.label(), host, minutes),
                None => format!("{} on {}", metric.label(), host),
            };
            let style = ChartStyle::for_metric(metric, &self.config);
            let rendered = render_chart(
                &loaded.samples,
                metric,
                &style,
                &caption,
                &chart_path(store, metric),
            );
            let path = match rendered {
                Ok(path) => path,
                Err(e) => {
                    for written in &charts {
                        if let Err(rm) = fs::remove_file(&written.path) {
                            warn!("Failed to remove partial chart {:?}: {}", written.path, rm);
                        }
                    }
                    return Err(e);
                }
            };
            info!("Wrote {} chart to {:?}", metric.suffix(), path);
            charts.push(RenderedChart {
                metric,
                path,
                stats,
                points: series(&loaded.samples, metric),
            });
        }

        Ok(RenderReport {
            charts,
            plotted: loaded.samples.len(),
            skipped: loaded.skipped,
        })
    }
}
