//! Session configuration with presets

use std::path::PathBuf;
use std::time::Duration;

use crate::calibration::CalibrationMode;
use crate::error::SpectrometerError;
use crate::monitor::MonitorConfig;

/// Session settings for a [`Microspectrometer`](crate::controller::Microspectrometer)
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrometerConfig {
    /// Integration time applied on connect, in microseconds
    pub integration_time_us: u32,

    /// Raw reads averaged when a request leaves the count unset
    pub number_of_scans: usize,

    /// Raw reads averaged per monitoring iteration
    pub monitor_scans: usize,

    /// Wait between monitoring iterations
    pub update_interval: Duration,

    /// Save every history entry (plus manifest) when disconnecting
    pub flush_on_disconnect: bool,

    /// Base directory for saved files (None = current directory)
    pub experiment_dir: Option<PathBuf>,
}

impl Default for SpectrometerConfig {
    fn default() -> Self {
        Self {
            integration_time_us: 100_000,
            number_of_scans: 10,
            monitor_scans: 1,
            update_interval: Duration::from_millis(500),
            flush_on_disconnect: false,
            experiment_dir: None,
        }
    }
}

impl SpectrometerConfig {
    /// Short exposures and no averaging, for live alignment
    pub fn fast_preview() -> Self {
        Self {
            integration_time_us: 10_000,
            number_of_scans: 1,
            monitor_scans: 1,
            update_interval: Duration::from_millis(100),
            ..Default::default()
        }
    }

    /// Long exposures and heavy averaging for quantitative work
    pub fn low_noise() -> Self {
        Self {
            integration_time_us: 500_000,
            number_of_scans: 50,
            monitor_scans: 5,
            update_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Reject settings the device could never accept
    pub fn validate(&self) -> Result<(), SpectrometerError> {
        if self.integration_time_us == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "integration time must be positive".to_string(),
            ));
        }
        if self.number_of_scans == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "number_of_scans must be at least 1".to_string(),
            ));
        }
        if self.monitor_scans == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "monitor_scans must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Monitoring settings derived from this session configuration
    pub fn monitor_config(&self, mode: CalibrationMode) -> MonitorConfig {
        MonitorConfig {
            mode,
            update_interval: self.update_interval,
            number_of_scans: self.monitor_scans,
            ..Default::default()
        }
    }
}
