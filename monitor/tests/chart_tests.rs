use hostmon::chart::{
    chart_path, series, smooth, ChartRenderer, Metric, Y_LABELS, Y_MAX_LIGHT_LINES,
};
use hostmon::config::ChartConfig;
use hostmon::record::read_records;
use hostmon::stats::SeriesStats;
use hostmon::MonitorError;
use plotters::coord::ranged1d::{BoldPoints, LightPoints, Ranged};
use plotters::coord::types::RangedCoordf64;
use plotters::style::IntoFont;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const STORE: &str = "timestamp,cpu,memory
2024-01-01 10:00:00,3.25,41.07
2024-01-01 10:00:15,2.10,41.09
2024-01-01 10:00:30,57.00,43.50
2024-01-01 10:00:45,12.75,42.00
";

fn write_store(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("hostmon-box-2024-01-01_10-00-00.csv");
    fs::write(&path, content).unwrap();
    path
}

/// Axis labels need a system sans-serif font; rendering tests skip without one.
fn fonts_available() -> bool {
    let available = ("sans-serif", 12).into_font().box_size("0").is_ok();
    if !available {
        eprintln!("no sans-serif font found, skipping chart rendering");
    }
    available
}

fn png_count(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
        .count()
}

#[test]
fn test_chart_paths_replace_extension() {
    let store = Path::new("/tmp/out/hostmon-box-2024-01-01_10-00-00.csv");
    assert_eq!(
        chart_path(store, Metric::Cpu),
        PathBuf::from("/tmp/out/hostmon-box-2024-01-01_10-00-00_cpu.png")
    );
    assert_eq!(
        chart_path(store, Metric::Memory),
        PathBuf::from("/tmp/out/hostmon-box-2024-01-01_10-00-00_memory.png")
    );
}

#[test]
fn test_series_uses_elapsed_seconds() {
    let dir = tempdir().unwrap();
    let loaded = read_records(&write_store(dir.path(), STORE)).unwrap();
    assert_eq!(
        series(&loaded.samples, Metric::Cpu),
        vec![(0.0, 3.25), (15.0, 2.10), (30.0, 57.0), (45.0, 12.75)]
    );
    assert_eq!(series(&loaded.samples, Metric::Memory)[2], (30.0, 43.5));
    assert!(series(&[], Metric::Cpu).is_empty());
}

#[test]
fn test_malformed_row_is_not_plotted() {
    let dir = tempdir().unwrap();
    let content = format!("{}2024-01-01 10:01:00,oops,42.00\n", STORE);
    let loaded = read_records(&write_store(dir.path(), &content)).unwrap();
    assert_eq!(series(&loaded.samples, Metric::Cpu).len(), 4);
    assert_eq!(series(&loaded.samples, Metric::Memory).len(), 4);
    assert_eq!(loaded.skipped, 1);
}

#[test]
fn test_series_is_stable_across_reads() {
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), STORE);
    let first = read_records(&path).unwrap();
    let second = read_records(&path).unwrap();
    for metric in Metric::ALL {
        assert_eq!(
            series(&first.samples, metric),
            series(&second.samples, metric)
        );
    }
}

#[test]
fn test_empty_store_renders_nothing() {
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), "timestamp,cpu,memory\n");
    let renderer = ChartRenderer::new(ChartConfig::default());
    let err = renderer.render(&path, "box", Some(10)).unwrap_err();
    assert!(matches!(err, MonitorError::EmptyRecordStore { .. }));
    assert_eq!(png_count(dir.path()), 0);
}

#[test]
fn test_store_with_only_bad_rows_renders_nothing() {
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), "timestamp,cpu,memory\nyesterday,1,2\n");
    let renderer = ChartRenderer::new(ChartConfig::default());
    assert!(matches!(
        renderer.render(&path, "box", None),
        Err(MonitorError::EmptyRecordStore { .. })
    ));
    assert_eq!(png_count(dir.path()), 0);
}

#[test]
fn test_smooth_passes_through_samples_and_stays_in_range() {
    let points = vec![(0.0, 0.0), (15.0, 100.0), (30.0, 0.0), (45.0, 100.0)];
    let curve = smooth(&points, 8);
    assert_eq!(curve.len(), 3 * 8 + 1);
    for (i, point) in points.iter().enumerate() {
        assert_eq!(curve[i * 8], *point);
    }
    assert!(curve.iter().all(|&(_, y)| (0.0..=100.0).contains(&y)));
    assert!(curve.windows(2).all(|w| w[0].0 <= w[1].0));
}

#[test]
fn test_smooth_disabled_returns_input() {
    let points = vec![(0.0, 10.0), (15.0, 20.0), (30.0, 30.0)];
    assert_eq!(smooth(&points, 0), points);
    assert_eq!(smooth(&points[..2], 8), points[..2].to_vec());
}

#[test]
fn test_series_stats() {
    let stats = SeriesStats::from_values(&[3.25, 2.10, 57.0, 12.75]).unwrap();
    assert_eq!(stats.count, 4);
    assert_eq!(stats.min, 2.10);
    assert_eq!(stats.max, 57.0);
    assert_eq!(stats.p95, 57.0);
    assert!((stats.mean - 18.775).abs() < 1e-9);
    assert!(SeriesStats::from_values(&[]).is_none());
}

#[test]
fn test_value_axis_grid_every_ten_units() {
    let axis: RangedCoordf64 = (0f64..100f64).into();
    let bold = axis.key_points(BoldPoints(Y_LABELS));
    let light = axis.key_points(LightPoints::new(Y_LABELS, Y_LABELS * Y_MAX_LIGHT_LINES));

    assert_eq!(bold.len(), 11);
    assert!(light.len() <= 11);
    for y in bold.iter().chain(light.iter()) {
        assert!((y / 10.0 - (y / 10.0).round()).abs() < 1e-9, "gridline at {}", y);
    }
}

#[test]
fn test_backwards_timestamp_is_not_plotted_left_of_origin() {
    let dir = tempdir().unwrap();
    // Clock stepped back an hour after the second sample
    let content = "timestamp,cpu,memory
2024-11-03 01:59:45,5.00,40.00
2024-11-03 02:00:00,6.00,40.00
2024-11-03 01:00:15,7.00,40.00
";
    let loaded = read_records(&write_store(dir.path(), content)).unwrap();
    let points = series(&loaded.samples, Metric::Cpu);
    assert_eq!(points.len(), 3);
    assert!(points.iter().all(|&(x, _)| x >= 0.0));
    assert_eq!(points[2], (0.0, 7.0));
}

#[test]
fn test_render_writes_both_charts() {
    if !fonts_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), STORE);
    let renderer = ChartRenderer::new(ChartConfig::default());
    let report = renderer.render(&path, "box", Some(1)).unwrap();
    assert_eq!(report.plotted, 4);
    assert_eq!(report.charts.len(), 2);
    for chart in &report.charts {
        assert_eq!(chart.path, chart_path(&path, chart.metric));
        assert!(chart.path.exists());
    }
    assert_eq!(png_count(dir.path()), 2);
}

#[test]
fn test_rerender_plots_same_points() {
    if !fonts_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), STORE);
    let renderer = ChartRenderer::new(ChartConfig::default());
    let first = renderer.render(&path, "box", Some(1)).unwrap();
    let second = renderer.render(&path, "box", Some(1)).unwrap();

    let loaded = read_records(&path).unwrap();
    assert_eq!(first.charts.len(), second.charts.len());
    for (a, b) in first.charts.iter().zip(&second.charts) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.points, b.points);
        assert_eq!(a.points, series(&loaded.samples, a.metric));
    }
    assert_eq!(png_count(dir.path()), 2);
}

#[test]
fn test_failed_memory_chart_removes_cpu_chart() {
    if !fonts_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let path = write_store(dir.path(), STORE);
    // A directory in the way makes writing the memory image fail
    fs::create_dir(chart_path(&path, Metric::Memory)).unwrap();

    let renderer = ChartRenderer::new(ChartConfig::default());
    let err = renderer.render(&path, "box", None).unwrap_err();
    assert!(matches!(err, MonitorError::Chart { .. }));
    assert!(!chart_path(&path, Metric::Cpu).exists());
    assert!(path.exists());
}
