//! # Device Interface
//!
//! The physical driver is an external collaborator. The controller sees it
//! through two traits:
//!
//! - [`SpectrometerDriver`]: enumerates devices and opens one
//! - [`DeviceConnection`]: an open device (integration time, wavelength
//!   calibration, raw intensity reads)
//!
//! [`simulated::SimulatedDriver`] implements both in-process for demos,
//! tests and benchmarks.

use std::fmt;

use crate::error::SpectrometerError;

pub mod simulated;

/// Errors reported by a device driver
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// Device is already opened by another session
    #[error("device is busy")]
    Busy,

    /// Read did not complete in time
    #[error("timeout: {0}")]
    Timeout(String),

    /// Generic driver I/O failure
    #[error("I/O failure: {0}")]
    Io(String),

    /// Device went away
    #[error("device disconnected")]
    Disconnected,

    /// Device refused a setting (e.g. integration time out of range)
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<DriverError> for SpectrometerError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Busy => SpectrometerError::DeviceBusy(err.to_string()),
            DriverError::Timeout(msg) => SpectrometerError::AcquisitionTimeout(msg),
            DriverError::Io(_) | DriverError::Disconnected | DriverError::Rejected(_) => {
                SpectrometerError::DeviceIoError(err.to_string())
            }
        }
    }
}

/// Identifies an enumerated device before it is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Model name (e.g. "USB2000+")
    pub model: String,
    /// Serial number
    pub serial_number: String,
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model, self.serial_number)
    }
}

/// Entry point of a spectrometer driver
pub trait SpectrometerDriver {
    /// Connection type produced by [`open`](Self::open)
    type Connection: DeviceConnection;

    /// Enumerate attached devices
    fn list_devices(&mut self) -> Result<Vec<DeviceHandle>, DriverError>;

    /// Open an enumerated device for exclusive use
    fn open(&mut self, handle: &DeviceHandle) -> Result<Self::Connection, DriverError>;
}

/// An open spectrometer
pub trait DeviceConnection {
    /// Release the device
    fn close(&mut self) -> Result<(), DriverError>;

    /// Set the exposure used by subsequent reads
    fn set_integration_time(&mut self, micros: u32) -> Result<(), DriverError>;

    /// Wavelength calibration, one entry per detector pixel
    fn wavelengths(&mut self) -> Result<Vec<f64>, DriverError>;

    /// Read one raw intensity array; blocks for about one exposure
    fn acquire_intensities(&mut self) -> Result<Vec<f64>, DriverError>;
}
