//! # Microspectrometer Controller
//!
//! [`Microspectrometer`] is the explicit session object: it owns the driver,
//! the open connection, the wavelength calibration and the [`SpectrumStore`].
//! Lifecycle is `connect → operate → disconnect`:
//!
//! ```text
//!                 connect()                 DeviceIoError
//! Disconnected ─────────────▶ Connected ─────────────────▶ Error
//!      ▲                          │                          │
//!      └──────── disconnect() ────┴──────── disconnect() ────┘
//! ```
//!
//! In the `Error` state the store stays readable and saveable, but every
//! device operation fails with `NotConnected` until the session is
//! disconnected and connected again.
//!
//! ## Example
//!
//! ```rust
//! use microspec::prelude::*;
//!
//! let mut spec = Microspectrometer::new(SimulatedDriver::default(), SpectrometerConfig::default())?;
//! spec.connect()?;
//! spec.measure(AcquisitionRequest::dark().scans(2))?;
//! spec.measure(AcquisitionRequest::reference().scans(2))?;
//! spec.measure(AcquisitionRequest::sample().scans(2))?;
//!
//! let absorbance = spec.absorbance(None)?;
//! assert_eq!(absorbance.spectrum_type(), SpectrumType::Absorbance);
//! spec.disconnect()?;
//! # Ok::<(), microspec::SpectrometerError>(())
//! ```

mod stats;

#[cfg(test)]
mod tests;

pub use stats::SaveAllStats;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::acquisition::{average_scans, AcquisitionRequest};
use crate::calibration::{self, CalibrationMode};
use crate::config::SpectrometerConfig;
use crate::device::{DeviceConnection, DeviceHandle, SpectrometerDriver};
use crate::error::SpectrometerError;
use crate::monitor::{
    self, MonitorConfig, MonitorSummary, SampleSource, SpectrumRenderer, StopToken,
};
use crate::spectrum::{Slot, Spectrum, SpectrumBuilder, SpectrumType};
use crate::store::{Manifest, SpectrumStore, StoreDescription};
use crate::xy;

/// Directory name used by `start_new_experiment` when none is given
const EXPERIMENT_DIR_FORMAT: &str = "%m%d%Y";

/// Connection state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No device bound
    Disconnected,
    /// Device bound and usable
    Connected,
    /// A device operation failed; disconnect to recover
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        };
        f.write_str(name)
    }
}

struct Session<C> {
    connection: C,
    device: DeviceHandle,
    wavelengths: Arc<[f64]>,
}

/// Session controller for one spectrometer
pub struct Microspectrometer<D: SpectrometerDriver> {
    driver: D,
    config: SpectrometerConfig,
    session: Option<Session<D::Connection>>,
    state: ConnectionState,
    integration_time: u32,
    store: SpectrumStore,
    session_id: Uuid,
    experiment_dir: PathBuf,
    last_device: Option<DeviceHandle>,
}

impl<D: SpectrometerDriver> fmt::Debug for Microspectrometer<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microspectrometer")
            .field("state", &self.state)
            .field("device", &self.device())
            .field("integration_time", &self.integration_time)
            .field("spectra", &self.store.len())
            .field("session_id", &self.session_id)
            .field("experiment_dir", &self.experiment_dir)
            .finish()
    }
}

impl<D: SpectrometerDriver> Microspectrometer<D> {
    /// Create a disconnected controller
    pub fn new(driver: D, config: SpectrometerConfig) -> Result<Self, SpectrometerError> {
        config.validate()?;
        let experiment_dir = config
            .experiment_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self {
            driver,
            integration_time: config.integration_time_us,
            config,
            session: None,
            state: ConnectionState::Disconnected,
            store: SpectrumStore::new(),
            session_id: Uuid::new_v4(),
            experiment_dir,
            last_device: None,
        })
    }

    /// Bind the first enumerated device.
    ///
    /// A no-op when already connected. From `Error`, the stale connection is
    /// released first.
    pub fn connect(&mut self) -> Result<(), SpectrometerError> {
        match self.state {
            ConnectionState::Connected => {
                debug!("connect() while connected; nothing to do");
                return Ok(());
            }
            ConnectionState::Error => self.release(),
            ConnectionState::Disconnected => {}
        }

        let handle = self
            .driver
            .list_devices()?
            .into_iter()
            .next()
            .ok_or(SpectrometerError::NoDeviceFound)?;
        let mut connection = self.driver.open(&handle)?;

        let wavelengths = match prepare(&mut connection, self.integration_time) {
            Ok(wavelengths) => wavelengths,
            Err(err) => {
                if let Err(close_err) = connection.close() {
                    warn!("Failed to release {} after setup error: {}", handle, close_err);
                }
                return Err(err);
            }
        };

        info!(
            "Connected to {}: {} pixels, {:.2} to {:.2} nm, integration time {} us",
            handle,
            wavelengths.len(),
            wavelengths[0],
            wavelengths[wavelengths.len() - 1],
            self.integration_time
        );
        self.last_device = Some(handle.clone());
        self.session = Some(Session {
            connection,
            device: handle,
            wavelengths,
        });
        self.state = ConnectionState::Connected;
        Ok(())
    }

    /// Release the device. A no-op when already disconnected.
    ///
    /// With `flush_on_disconnect` the whole history is saved first; a failed
    /// save keeps the device bound.
    pub fn disconnect(&mut self) -> Result<(), SpectrometerError> {
        if self.session.is_none() {
            self.state = ConnectionState::Disconnected;
            return Ok(());
        }

        if self.config.flush_on_disconnect && !self.store.is_empty() {
            let stats = self.save_all_spectra()?;
            info!("{}", stats);
        }

        let recovering = self.state == ConnectionState::Error;
        self.state = ConnectionState::Disconnected;
        if let Some(mut session) = self.session.take() {
            match session.connection.close() {
                Ok(()) => info!("Disconnected from {}", session.device),
                Err(err) if recovering => {
                    warn!("Ignoring close failure on faulted {}: {}", session.device, err)
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.connection.close() {
                warn!("Failed to release {}: {}", session.device, err);
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns true in the `Connected` state
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// The bound device, if any
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.session.as_ref().map(|s| &s.device)
    }

    /// Wavelength calibration of the bound device
    pub fn wavelengths(&self) -> Option<&[f64]> {
        self.session.as_ref().map(|s| &s.wavelengths[..])
    }

    /// Integration time in microseconds
    pub fn integration_time(&self) -> u32 {
        self.integration_time
    }

    /// Session settings
    pub fn config(&self) -> &SpectrometerConfig {
        &self.config
    }

    /// Identifier written into the session manifest
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Base directory for saved files
    pub fn experiment_dir(&self) -> &Path {
        &self.experiment_dir
    }

    /// Read-only view of the session history and slots
    pub fn store(&self) -> &SpectrumStore {
        &self.store
    }

    fn session_mut(&mut self) -> Result<&mut Session<D::Connection>, SpectrometerError> {
        match (self.state, self.session.as_mut()) {
            (ConnectionState::Connected, Some(session)) => Ok(session),
            _ => Err(SpectrometerError::NotConnected),
        }
    }

    /// Move to `Error` on a device fault
    fn track<T>(&mut self, result: Result<T, SpectrometerError>) -> Result<T, SpectrometerError> {
        if let Err(SpectrometerError::DeviceIoError(msg)) = &result {
            warn!("Device fault, entering error state: {}", msg);
            self.state = ConnectionState::Error;
        }
        result
    }

    /// Set the exposure used by subsequent acquisitions
    pub fn change_integration_time(&mut self, micros: u32) -> Result<(), SpectrometerError> {
        if micros == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "integration time must be positive".to_string(),
            ));
        }
        let result = self
            .session_mut()?
            .connection
            .set_integration_time(micros)
            .map_err(SpectrometerError::from);
        self.track(result)?;

        debug!("Integration time {} -> {} us", self.integration_time, micros);
        self.integration_time = micros;
        Ok(())
    }

    fn acquire_counts(
        &mut self,
        number_of_scans: usize,
    ) -> Result<(Vec<f64>, Arc<[f64]>), SpectrometerError> {
        let result = {
            let session = self.session_mut()?;
            let pixel_count = session.wavelengths.len();
            average_scans(&mut session.connection, number_of_scans, pixel_count)
                .map(|counts| (counts, Arc::clone(&session.wavelengths)))
        };
        self.track(result)
    }

    /// Build a freshly acquired spectrum, consuming a scan number on success
    fn new_spectrum(
        &mut self,
        spectrum_type: SpectrumType,
        counts: Vec<f64>,
        wavelengths: Arc<[f64]>,
        comments: &str,
    ) -> Result<Spectrum, SpectrometerError> {
        let spectrum = SpectrumBuilder::new(self.store.peek_scan_number(), spectrum_type)
            .integration_time(self.integration_time)
            .wavelengths(wavelengths)
            .counts(counts)
            .comments(comments)
            .build()?;
        self.store.allocate_scan_number();
        Ok(spectrum)
    }

    /// Acquire an averaged spectrum.
    ///
    /// Without an explicit scan count the session's `number_of_scans` is used.
    /// The whole call fails if any raw read fails. When saving is requested
    /// the file is written before the store is touched.
    pub fn measure(&mut self, request: AcquisitionRequest) -> Result<Spectrum, SpectrometerError> {
        request.validate()?;
        let number_of_scans = request
            .number_of_scans
            .unwrap_or(self.config.number_of_scans);
        let (counts, wavelengths) = self.acquire_counts(number_of_scans)?;
        let spectrum =
            self.new_spectrum(request.spectrum_type, counts, wavelengths, &request.comments)?;

        if request.save {
            let file_name = request
                .filename
                .unwrap_or_else(|| PathBuf::from(xy::default_file_name(&spectrum)));
            let path = self.experiment_dir.join(file_name);
            xy::save_spectrum(&path, &spectrum)?;
            debug!("Saved scan {} to {}", spectrum.scan_number(), path.display());
        }
        if request.store {
            self.store.append(spectrum.clone());
        }

        debug!(
            "Measured scan {} ({}, {} scans at {} us)",
            spectrum.scan_number(),
            spectrum.spectrum_type(),
            number_of_scans,
            spectrum.integration_time()
        );
        Ok(spectrum)
    }

    /// Calibrate the current sample against the dark slot and a reference.
    ///
    /// `reference_index` selects a history entry; `None` uses the reference slot.
    pub fn calibrated(
        &self,
        mode: CalibrationMode,
        reference_index: Option<usize>,
    ) -> Result<Spectrum, SpectrometerError> {
        let sample = self.store.require(Slot::Current)?;
        let reference = self.store.resolve_reference(reference_index)?;
        let dark = self.store.require(Slot::Dark)?;
        calibration::calibrate(mode, sample, reference, dark)
    }

    /// Absorbance of the current sample
    pub fn absorbance(&self, reference_index: Option<usize>) -> Result<Spectrum, SpectrometerError> {
        self.calibrated(CalibrationMode::Absorbance, reference_index)
    }

    /// Percent transmission of the current sample
    pub fn transmission(
        &self,
        reference_index: Option<usize>,
    ) -> Result<Spectrum, SpectrometerError> {
        self.calibrated(CalibrationMode::Transmission, reference_index)
    }

    /// Calibrate the current sample and write the result; returns the path
    pub fn save_calibrated(
        &self,
        mode: CalibrationMode,
        reference_index: Option<usize>,
        filename: Option<&Path>,
    ) -> Result<PathBuf, SpectrometerError> {
        let spectrum = self.calibrated(mode, reference_index)?;
        let path = match filename {
            Some(name) => self.experiment_dir.join(name),
            None => self.experiment_dir.join(xy::default_file_name(&spectrum)),
        };
        xy::save_spectrum(&path, &spectrum)?;
        info!("Saved {} of scan {} to {}", mode, spectrum.scan_number(), path.display());
        Ok(path)
    }

    /// Point the slot of `spectrum_type` at an existing history entry
    pub fn set_spectrum(
        &mut self,
        spectrum_type: SpectrumType,
        index: usize,
    ) -> Result<(), SpectrometerError> {
        let slot = Slot::for_type(spectrum_type)?;
        self.store.set_slot(slot, index)
    }

    /// Load a dark or reference spectrum from an `.xy` file.
    ///
    /// The file is appended to history with a fresh scan number and the
    /// matching slot is repointed. Its axis is not checked against the
    /// device; a mismatch surfaces at calibration time.
    pub fn load_spectrum<P: AsRef<Path>>(
        &mut self,
        spectrum_type: SpectrumType,
        path: P,
    ) -> Result<&Spectrum, SpectrometerError> {
        let slot = match spectrum_type {
            SpectrumType::Dark => Slot::Dark,
            SpectrumType::Reference => Slot::Reference,
            other => return Err(SpectrometerError::UnsupportedSlotType(other)),
        };
        let path = path.as_ref();
        let doc = xy::read_xy_file(self.experiment_dir.join(path))?;

        let provenance = match doc.header.scan_number {
            Some(scan) => format!("loaded from {} (scan {})", path.display(), scan),
            None => format!("loaded from {}", path.display()),
        };
        let comments = match doc.header.comments.as_deref() {
            Some(recorded) if !recorded.is_empty() => format!("{}; {}", recorded, provenance),
            _ => provenance,
        };

        // Share the device axis when the file was recorded on it
        let wavelengths: Arc<[f64]> = match &self.session {
            Some(session) if session.wavelengths[..] == doc.wavelengths[..] => {
                Arc::clone(&session.wavelengths)
            }
            _ => Arc::from(doc.wavelengths),
        };

        let mut builder = SpectrumBuilder::new(self.store.peek_scan_number(), spectrum_type)
            .integration_time(doc.header.integration_time.unwrap_or(self.integration_time))
            .wavelengths(wavelengths)
            .values(doc.values)
            .comments(comments);
        if let Some(timestamp) = doc.header.timestamp {
            builder = builder.timestamp(timestamp);
        }
        let spectrum = builder.build()?;
        self.store.allocate_scan_number();

        debug!(
            "Loaded {} as scan {} ({} points) into the {} slot",
            path.display(),
            spectrum.scan_number(),
            spectrum.len(),
            slot
        );
        let index = self.store.append(spectrum);
        self.store.get(index)
    }

    /// Write every history entry to the experiment directory, plus `manifest.json`
    pub fn save_all_spectra(&self) -> Result<SaveAllStats, SpectrometerError> {
        let directory = self.experiment_dir.clone();
        fs::create_dir_all(&directory)?;

        let mut file_names = Vec::with_capacity(self.store.len());
        let mut points_written = 0;
        for spectrum in self.store.iter() {
            let file_name = xy::default_file_name(spectrum);
            xy::save_spectrum(directory.join(&file_name), spectrum)?;
            points_written += spectrum.len();
            file_names.push(file_name);
        }

        let device = self.last_device.as_ref().map(|d| d.to_string());
        let manifest = Manifest::from_store(self.session_id, device, &self.store, &file_names);
        let manifest_path = manifest.save(&directory)?;

        let stats = SaveAllStats {
            files_written: file_names.len(),
            points_written,
            directory,
            manifest_path,
        };
        info!("{}", stats);
        Ok(stats)
    }

    /// Create (if needed) and switch to a new experiment directory.
    ///
    /// Without a path, a date-stamped `MMDDYYYY` directory is used.
    pub fn start_new_experiment(&mut self, directory: Option<&Path>) -> Result<&Path, SpectrometerError> {
        let directory = match directory {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from(Local::now().format(EXPERIMENT_DIR_FORMAT).to_string()),
        };
        fs::create_dir_all(&directory)?;
        info!("Experiment directory: {}", directory.display());
        self.experiment_dir = directory;
        Ok(&self.experiment_dir)
    }

    /// Summary table of the session history
    pub fn describe_all_spectra(&self) -> StoreDescription {
        self.store.describe()
    }

    /// Run the monitoring loop against the dark slot and the configured reference.
    ///
    /// Reference and dark are resolved once, before the first acquisition,
    /// and must share a wavelength axis.
    /// Monitoring samples are not added to the history.
    pub fn monitor<R>(
        &mut self,
        config: &MonitorConfig,
        stop: &StopToken,
        renderer: &mut R,
    ) -> Result<MonitorSummary, SpectrometerError>
    where
        R: SpectrumRenderer + ?Sized,
    {
        self.session_mut()?;
        let reference = self.store.resolve_reference(config.reference_index)?.clone();
        let dark = self.store.require(Slot::Dark)?.clone();
        monitor::run(self, &reference, &dark, config, stop, renderer)
    }

    /// Live absorbance display refreshed every `update_interval`
    pub fn continuous_measurements<R>(
        &mut self,
        update_interval: Duration,
        reference_index: Option<usize>,
        stop: &StopToken,
        renderer: &mut R,
    ) -> Result<MonitorSummary, SpectrometerError>
    where
        R: SpectrumRenderer + ?Sized,
    {
        let config = MonitorConfig {
            update_interval,
            ..self.config.monitor_config(CalibrationMode::Absorbance)
        }
        .with_reference_index(reference_index);
        self.monitor(&config, stop, renderer)
    }

    /// Live transmission display refreshed every `update_interval`
    pub fn continuous_transmission<R>(
        &mut self,
        update_interval: Duration,
        reference_index: Option<usize>,
        stop: &StopToken,
        renderer: &mut R,
    ) -> Result<MonitorSummary, SpectrometerError>
    where
        R: SpectrumRenderer + ?Sized,
    {
        let config = MonitorConfig {
            update_interval,
            ..self.config.monitor_config(CalibrationMode::Transmission)
        }
        .with_reference_index(reference_index);
        self.monitor(&config, stop, renderer)
    }
}

impl<D: SpectrometerDriver> SampleSource for Microspectrometer<D> {
    fn acquire_sample(&mut self, number_of_scans: usize) -> Result<Spectrum, SpectrometerError> {
        let (counts, wavelengths) = self.acquire_counts(number_of_scans)?;
        self.new_spectrum(SpectrumType::Sample, counts, wavelengths, "monitoring")
    }

    fn persist(&mut self, spectrum: &Spectrum) -> Result<PathBuf, SpectrometerError> {
        let path = self.experiment_dir.join(xy::default_file_name(spectrum));
        xy::save_spectrum(&path, spectrum)?;
        Ok(path)
    }
}

/// Apply the session integration time and read the wavelength calibration
fn prepare<C: DeviceConnection>(
    connection: &mut C,
    integration_time: u32,
) -> Result<Arc<[f64]>, SpectrometerError> {
    connection.set_integration_time(integration_time)?;
    let wavelengths = connection.wavelengths()?;
    if wavelengths.is_empty() {
        return Err(SpectrometerError::DeviceIoError(
            "device reported an empty wavelength calibration".to_string(),
        ));
    }
    let increasing = wavelengths
        .windows(2)
        .all(|w| w[0].is_finite() && w[1] > w[0]);
    if !increasing || !wavelengths[wavelengths.len() - 1].is_finite() {
        return Err(SpectrometerError::DeviceIoError(
            "device wavelength calibration is not strictly increasing".to_string(),
        ));
    }
    Ok(Arc::from(wavelengths))
}
