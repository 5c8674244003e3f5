//! Time-bounded host CPU and memory capture with PNG charts.

pub mod chart;
pub mod collector;
pub mod config;
pub mod error;
pub mod record;
pub mod run;
pub mod sampler;
pub mod stats;

pub use error::{MeasurementError, MonitorError, Result};
