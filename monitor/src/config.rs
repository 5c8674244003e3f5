//! Configuration management (TOML file plus the per-run capture settings)

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SAMPLE_INTERVAL_SECONDS: u32 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub sample_interval_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub line_width: u32,
    pub point_size: u32,
    /// Interpolated points per segment of the smoothed line; 0 draws straight segments.
    pub smoothing_steps: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            width: 1280,
            height: 720,
            line_width: 2,
            point_size: 3,
            smoothing_steps: 8,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            general: GeneralConfig {
                sample_interval_seconds: DEFAULT_SAMPLE_INTERVAL_SECONDS,
                output_dir: None,
            },
            chart: ChartConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| MonitorError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| MonitorError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "hostmon")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory that receives record stores and charts: the configured
    /// `output_dir`, else the directory holding the running executable.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.general.output_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Validates operator input for the capture duration.
///
/// Accepts only an unsigned integer literal (ASCII digits, surrounding
/// whitespace ignored) whose value is greater than zero.
pub fn parse_duration(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let invalid = |reason: &str| MonitorError::InvalidDuration {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("expected a whole number of minutes"));
    }
    let minutes: u32 = trimmed
        .parse()
        .map_err(|_| invalid("number of minutes is too large"))?;
    if minutes == 0 {
        return Err(invalid("duration must be greater than zero"));
    }
    Ok(minutes)
}

/// Settings for a single capture, fixed before the sampler starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub duration_minutes: u32,
    pub sample_interval_seconds: u32,
    pub output_path: PathBuf,
}

impl RunConfig {
    pub fn new(
        duration_minutes: u32,
        sample_interval_seconds: u32,
        output_path: PathBuf,
    ) -> Result<Self> {
        if duration_minutes == 0 {
            return Err(MonitorError::InvalidDuration {
                input: duration_minutes.to_string(),
                reason: "duration must be greater than zero".to_string(),
            });
        }
        if sample_interval_seconds == 0 {
            return Err(MonitorError::InvalidInterval(sample_interval_seconds));
        }
        Ok(Self {
            duration_minutes,
            sample_interval_seconds,
            output_path,
        })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_minutes) * 60)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.sample_interval_seconds))
    }

    /// Nominal number of samples a full run produces.
    pub fn expected_samples(&self) -> u64 {
        self.duration().as_secs() / u64::from(self.sample_interval_seconds)
    }
}
