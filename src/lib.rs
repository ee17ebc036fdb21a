//! # microspec - UV-Vis Microspectrometer Control
//!
//! `microspec` drives a fiber-coupled UV-Vis microspectrometer: it acquires
//! averaged raw spectra, keeps them in a session history with swappable
//! dark/reference/current slots, computes dark-corrected transmission and
//! absorbance, runs a cancellable live-monitoring loop, and reads and writes
//! two-column `.xy` spectrum files.
//!
//! ## Key Features
//!
//! - **Explicit session object**: [`Microspectrometer`](controller::Microspectrometer)
//!   owns the device connection and the spectrum store; no global state.
//!
//! - **Slot pointers, not copies**: the dark, reference and current slots are
//!   indices into an append-only history, so repointing is O(1) and history
//!   is never edited.
//!
//! - **Explicit missing values**: calibration never aborts on a bad point;
//!   non-physical ratios become undefined entries of
//!   [`SpectralValues`](spectrum::SpectralValues).
//!
//! - **Cooperative cancellation**: the monitoring loop polls a
//!   [`StopToken`](monitor::StopToken) and never leaves half an iteration behind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use microspec::prelude::*;
//!
//! let mut spec = Microspectrometer::new(SimulatedDriver::default(), SpectrometerConfig::default())?;
//! spec.connect()?;
//! spec.start_new_experiment(None)?;
//!
//! spec.measure(AcquisitionRequest::dark().scans(10))?;
//! spec.measure(AcquisitionRequest::reference().scans(10))?;
//! spec.measure(AcquisitionRequest::sample().scans(10).comments("cuvette 1"))?;
//! spec.save_calibrated(CalibrationMode::Absorbance, None, None)?;
//!
//! // Live absorbance until another thread calls `stop.stop()`
//! let stop = StopToken::new();
//! spec.continuous_measurements(Duration::from_millis(500), None, &stop, &mut LogRenderer)?;
//!
//! let stats = spec.save_all_spectra()?;
//! println!("{}", stats);
//! spec.disconnect()?;
//! # Ok::<(), microspec::SpectrometerError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`spectrum`]: the immutable `Spectrum` record and its value buffer
//! - [`store`]: append-only history with calibration slots and session manifest
//! - [`device`]: driver traits and the in-process simulator
//! - [`acquisition`]: acquisition requests and host-side scan averaging
//! - [`calibration`]: dark-corrected transmission and absorbance
//! - [`monitor`]: the live monitoring loop and its renderers
//! - [`xy`]: the two-column ASCII file format
//! - [`config`]: session settings and presets
//! - [`controller`]: the `Microspectrometer` session object
//! - [`error`]: the error taxonomy

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod monitor;
pub mod spectrum;
pub mod store;
pub mod xy;

pub use error::SpectrometerError;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::acquisition::AcquisitionRequest;
    pub use crate::calibration::{absorbance, calibrate, transmission, CalibrationMode};
    pub use crate::config::SpectrometerConfig;
    pub use crate::controller::{ConnectionState, Microspectrometer, SaveAllStats};
    pub use crate::device::simulated::{Absorber, SimulatedDriver, SimulatorConfig};
    pub use crate::device::{DeviceConnection, DeviceHandle, DriverError, SpectrometerDriver};
    pub use crate::error::SpectrometerError;
    pub use crate::monitor::{
        ChannelRenderer, LogRenderer, MonitorConfig, MonitorSummary, RenderEvent, RenderFrame,
        SampleSource, SpectrumRenderer, StopToken,
    };
    pub use crate::spectrum::{Slot, SpectralValues, Spectrum, SpectrumBuilder, SpectrumType};
    pub use crate::store::{Manifest, SpectrumStore, StoreDescription};
    pub use crate::xy::{read_xy_file, save_spectrum};
}
