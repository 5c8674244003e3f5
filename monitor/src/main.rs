use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use hostmon::{
    chart::{ChartRenderer, RenderReport},
    collector::LinuxMetricsProvider,
    config::{parse_duration, Config, RunConfig},
    run::{host_name, record_store_path},
    sampler::{interrupt_signal, Sampler},
};
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hostmon", version, about = "Capture host CPU and memory usage and chart it")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sample for a fixed number of minutes, then render charts (default)
    Capture(CaptureArgs),
    /// Render charts from an existing record store
    Render {
        store: PathBuf,
        /// Nominal capture length shown in the chart title
        #[arg(long)]
        duration: Option<u32>,
    },
}

#[derive(clap::Args, Default)]
struct CaptureArgs {
    /// Minutes to sample for; prompted for when omitted
    #[arg(short, long, allow_hyphen_values = true)]
    duration: Option<String>,
    /// Seconds between samples
    #[arg(long)]
    interval: Option<u32>,
    /// Directory for the record store and charts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    if !config_path.exists() {
        if path.is_some() {
            warn!("Config file {:?} not found, using defaults", config_path);
        } else {
            info!("No config file found, using defaults");
        }
        return Config::default();
    }
    Config::load(&config_path).unwrap_or_else(|e| {
        warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    })
}

fn prompt_duration() -> io::Result<String> {
    print!("Enter duration in minutes: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

fn print_report(store: &Path, report: &RenderReport) {
    println!("Record store: {}", store.display());
    for chart in &report.charts {
        println!("{:<13} {}", format!("{}:", chart.metric.label()), chart.path.display());
        println!("              {}", chart.stats);
    }
    if report.skipped > 0 {
        println!("Skipped {} malformed row(s)", report.skipped);
    }
}

async fn capture(config: Config, args: CaptureArgs) -> Result<()> {
    // Validate before anything touches the filesystem
    let raw = match args.duration {
        Some(raw) => raw,
        None => prompt_duration().context("Failed to read duration")?,
    };
    let duration_minutes = parse_duration(&raw)?;

    let interval = args
        .interval
        .unwrap_or(config.general.sample_interval_seconds);
    let output_dir = args.output_dir.unwrap_or_else(|| config.output_dir());
    let host = host_name();
    let output_path = record_store_path(&output_dir, &host, Local::now().naive_local());
    let run_config = RunConfig::new(duration_minutes, interval, output_path)?;
    let store = run_config.output_path.clone();

    let interrupt: Pin<Box<dyn Future<Output = ()>>> = match interrupt_signal() {
        Ok(signal) => Box::pin(signal),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            Box::pin(std::future::pending())
        }
    };
    let sampler = Sampler::new(LinuxMetricsProvider::new(), run_config);
    println!("Recording to {} (Ctrl-C stops early)", store.display());
    let sampling = sampler.run(interrupt).await?;
    if sampling.cpu_failures + sampling.memory_failures > 0 {
        warn!(
            "{} cpu and {} memory reading(s) failed and were recorded as 0.0",
            sampling.cpu_failures, sampling.memory_failures
        );
    }

    let renderer = ChartRenderer::new(config.chart);
    let report = renderer
        .render(&store, &host, Some(duration_minutes))
        .with_context(|| format!("Sampling completed but rendering {:?} failed", store))?;
    print_report(&store, &report);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Some(Command::Render { store, duration }) => {
            let renderer = ChartRenderer::new(config.chart);
            let report = renderer
                .render(&store, &host_name(), duration)
                .with_context(|| format!("Failed to render {:?}", store))?;
            print_report(&store, &report);
            Ok(())
        }
        Some(Command::Capture(args)) => capture(config, args).await,
        None => capture(config, CaptureArgs::default()).await,
    }
}
