//! TOML configuration file support.
//!
//! Instead of passing flags on every run, settings can live in a file:
//!
//! ```toml
//! # microspec.toml
//! [device]
//! integration_time_us = 150000
//!
//! [acquisition]
//! number_of_scans = 20
//!
//! [monitor]
//! mode = "transmission"
//! update_interval_ms = 250
//! number_of_scans = 2
//! iterations = 40
//!
//! [output]
//! experiment_dir = "runs/today"
//! flush_on_disconnect = true
//! ```
//!
//! Every key is optional. Command-line flags win over file values, file
//! values win over the built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use microspec::calibration::CalibrationMode;
use microspec::config::SpectrometerConfig;

/// Root configuration structure for microspec.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Device settings.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Acquisition settings.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Monitoring loop settings.
    #[serde(default)]
    pub monitor: MonitorSection,

    /// Where files go.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[device]` table.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceConfig {
    /// Integration time in microseconds.
    pub integration_time_us: Option<u32>,
}

/// `[acquisition]` table.
#[derive(Debug, Default, Deserialize)]
pub struct AcquisitionConfig {
    /// Raw reads averaged per acquisition.
    pub number_of_scans: Option<usize>,
}

/// `[monitor]` table.
#[derive(Debug, Default, Deserialize)]
pub struct MonitorSection {
    /// Displayed quantity.
    pub mode: Option<CalibrationMode>,

    /// Wait between iterations in milliseconds.
    pub update_interval_ms: Option<u64>,

    /// Raw reads averaged per iteration.
    pub number_of_scans: Option<usize>,

    /// Number of iterations the demo runs.
    pub iterations: Option<usize>,
}

/// `[output]` table.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Experiment directory.
    pub experiment_dir: Option<PathBuf>,

    /// Save the session when disconnecting.
    pub flush_on_disconnect: Option<bool>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Overlay the values present in the file onto `base`.
    pub fn apply(&self, base: SpectrometerConfig) -> SpectrometerConfig {
        SpectrometerConfig {
            integration_time_us: self
                .device
                .integration_time_us
                .unwrap_or(base.integration_time_us),
            number_of_scans: self
                .acquisition
                .number_of_scans
                .unwrap_or(base.number_of_scans),
            monitor_scans: self.monitor.number_of_scans.unwrap_or(base.monitor_scans),
            update_interval: self
                .monitor
                .update_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(base.update_interval),
            flush_on_disconnect: self
                .output
                .flush_on_disconnect
                .unwrap_or(base.flush_on_disconnect),
            experiment_dir: self.output.experiment_dir.clone().or(base.experiment_dir),
        }
    }
}
