//! In-process spectrometer simulator.
//!
//! Models a 2048-pixel CCD behind a deuterium/halogen lamp: quadratic
//! wavelength calibration, exposure-proportional signal, a dark offset,
//! deterministic noise and an optional absorbing sample in the light path.
//! A shared [`SimulatedControls`] handle scripts frames and injects faults.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{DeviceConnection, DeviceHandle, DriverError, SpectrometerDriver};

/// Gaussian absorption band placed between lamp and detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Absorber {
    /// Band centre in nm
    pub center_nm: f64,
    /// Band standard deviation in nm
    pub width_nm: f64,
    /// Absorbance (log10 units) at the band centre
    pub peak_absorbance: f64,
}

impl Default for Absorber {
    fn default() -> Self {
        Self {
            center_nm: 520.0,
            width_nm: 30.0,
            peak_absorbance: 0.5,
        }
    }
}

/// Simulator settings
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Model reported during enumeration
    pub model: String,
    /// Serial number reported during enumeration
    pub serial_number: String,
    /// Number of detector pixels
    pub pixel_count: usize,
    /// Calibration polynomial: wavelength = c0 + c1*i + c2*i^2
    pub calibration: [f64; 3],
    /// Lamp counts at the halogen maximum for a 100 ms exposure
    pub lamp_amplitude: f64,
    /// Dark offset in counts
    pub dark_level: f64,
    /// Peak-to-peak noise in counts
    pub noise: f64,
    /// Detector saturation in counts
    pub saturation: f64,
    /// Supported integration time range in microseconds
    pub integration_range: (u32, u32),
    /// Sleep for the integration time on every read
    pub realtime: bool,
    /// Seed of the noise generator; equal seeds give identical frames
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            model: "SIM2048".to_string(),
            serial_number: "SIM00001".to_string(),
            pixel_count: 2048,
            calibration: [200.0, 0.34, -1.15e-5],
            lamp_amplitude: 3000.0,
            dark_level: 90.0,
            noise: 4.0,
            saturation: 65_535.0,
            integration_range: (1_000, 65_000_000),
            realtime: false,
            seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimulatorConfig,
    present: bool,
    opened: bool,
    shutter_closed: bool,
    absorber: Option<Absorber>,
    scripted: VecDeque<Vec<f64>>,
    faults: Vec<(usize, DriverError)>,
    rng: ChaCha8Rng,
    attempts: usize,
    reads: usize,
}

impl SimState {
    fn wavelengths(&self) -> Vec<f64> {
        let [c0, c1, c2] = self.config.calibration;
        (0..self.config.pixel_count)
            .map(|i| {
                let x = i as f64;
                c0 + c1 * x + c2 * x * x
            })
            .collect()
    }

    fn next_noise(&mut self) -> f64 {
        let half = self.config.noise / 2.0;
        if half <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-half..half)
    }

    fn frame(&mut self, integration_time: u32) -> Vec<f64> {
        let scale = integration_time as f64 / 100_000.0;
        let wavelengths = self.wavelengths();
        let dark = self.config.dark_level;
        let saturation = self.config.saturation;
        let amplitude = self.config.lamp_amplitude;
        let shutter_closed = self.shutter_closed;
        let absorber = self.absorber;

        wavelengths
            .iter()
            .map(|&wl| {
                let light = if shutter_closed {
                    0.0
                } else {
                    let lamp = lamp_profile(wl) * amplitude * scale;
                    match absorber {
                        Some(a) => lamp * 10f64.powf(-a.absorbance_at(wl)),
                        None => lamp,
                    }
                };
                (dark + light + self.next_noise()).clamp(0.0, saturation)
            })
            .collect()
    }
}

impl Absorber {
    /// Absorbance of the band at `wavelength_nm`
    pub fn absorbance_at(&self, wavelength_nm: f64) -> f64 {
        let z = (wavelength_nm - self.center_nm) / self.width_nm;
        self.peak_absorbance * (-0.5 * z * z).exp()
    }
}

/// Relative lamp output: halogen continuum plus the deuterium UV hump
fn lamp_profile(wavelength_nm: f64) -> f64 {
    let halogen = (-0.5 * ((wavelength_nm - 600.0) / 150.0).powi(2)).exp();
    let deuterium = 0.4 * (-0.5 * ((wavelength_nm - 250.0) / 40.0).powi(2)).exp();
    halogen + deuterium + 0.02
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle for scripting the simulator from outside the controller
#[derive(Debug, Clone)]
pub struct SimulatedControls {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedControls {
    /// Attach or detach the device from enumeration
    pub fn set_present(&self, present: bool) {
        lock(&self.state).present = present;
    }

    /// Mark the device as bound by another session
    pub fn set_busy(&self, busy: bool) {
        lock(&self.state).opened = busy;
    }

    /// Block the light path (dark acquisitions)
    pub fn set_shutter_closed(&self, closed: bool) {
        lock(&self.state).shutter_closed = closed;
    }

    /// Place or remove an absorbing sample
    pub fn set_absorber(&self, absorber: Option<Absorber>) {
        lock(&self.state).absorber = absorber;
    }

    /// Queue raw frames returned verbatim by the next reads
    pub fn push_frames<I>(&self, frames: I)
    where
        I: IntoIterator<Item = Vec<f64>>,
    {
        lock(&self.state).scripted.extend(frames);
    }

    /// Make the next read fail with `error`
    pub fn inject_fault(&self, error: DriverError) {
        self.inject_fault_after(0, error);
    }

    /// Let `reads` more reads succeed, then fail the following one with `error`
    pub fn inject_fault_after(&self, reads: usize, error: DriverError) {
        let mut state = lock(&self.state);
        let at = state.attempts + reads;
        state.faults.push((at, error));
    }

    /// Number of completed raw reads
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    /// Returns true while a connection is open
    pub fn is_open(&self) -> bool {
        lock(&self.state).opened
    }

    /// The wavelength calibration the device reports
    pub fn wavelengths(&self) -> Vec<f64> {
        lock(&self.state).wavelengths()
    }
}

/// Driver producing [`SimulatedConnection`]s
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl SimulatedDriver {
    /// Create a simulator with one attached device
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            state: Arc::new(Mutex::new(SimState {
                config,
                present: true,
                opened: false,
                shutter_closed: false,
                absorber: None,
                scripted: VecDeque::new(),
                faults: Vec::new(),
                rng,
                attempts: 0,
                reads: 0,
            })),
        }
    }

    /// A small detector for fast tests
    pub fn with_pixels(pixel_count: usize) -> Self {
        Self::new(SimulatorConfig {
            pixel_count,
            calibration: [400.0, 10.0, 0.0],
            noise: 0.0,
            ..Default::default()
        })
    }

    /// Scripting handle sharing state with this driver
    pub fn controls(&self) -> SimulatedControls {
        SimulatedControls {
            state: Arc::clone(&self.state),
        }
    }
}

impl SpectrometerDriver for SimulatedDriver {
    type Connection = SimulatedConnection;

    fn list_devices(&mut self) -> Result<Vec<DeviceHandle>, DriverError> {
        let state = lock(&self.state);
        if !state.present {
            return Ok(Vec::new());
        }
        Ok(vec![DeviceHandle {
            model: state.config.model.clone(),
            serial_number: state.config.serial_number.clone(),
        }])
    }

    fn open(&mut self, handle: &DeviceHandle) -> Result<Self::Connection, DriverError> {
        let mut state = lock(&self.state);
        if !state.present || handle.serial_number != state.config.serial_number {
            return Err(DriverError::Disconnected);
        }
        if state.opened {
            return Err(DriverError::Busy);
        }
        state.opened = true;
        Ok(SimulatedConnection {
            state: Arc::clone(&self.state),
            integration_time: 100_000,
            open: true,
        })
    }
}

/// Open simulated device
#[derive(Debug)]
pub struct SimulatedConnection {
    state: Arc<Mutex<SimState>>,
    integration_time: u32,
    open: bool,
}

impl SimulatedConnection {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.open {
            Ok(())
        } else {
            Err(DriverError::Disconnected)
        }
    }
}

impl DeviceConnection for SimulatedConnection {
    fn close(&mut self) -> Result<(), DriverError> {
        if self.open {
            lock(&self.state).opened = false;
            self.open = false;
        }
        Ok(())
    }

    fn set_integration_time(&mut self, micros: u32) -> Result<(), DriverError> {
        self.ensure_open()?;
        let (min, max) = lock(&self.state).config.integration_range;
        if micros < min || micros > max {
            return Err(DriverError::Rejected(format!(
                "integration time {} us outside supported range {}..={} us",
                micros, min, max
            )));
        }
        self.integration_time = micros;
        Ok(())
    }

    fn wavelengths(&mut self) -> Result<Vec<f64>, DriverError> {
        self.ensure_open()?;
        Ok(lock(&self.state).wavelengths())
    }

    fn acquire_intensities(&mut self) -> Result<Vec<f64>, DriverError> {
        self.ensure_open()?;
        let realtime = {
            let mut state = lock(&self.state);
            let attempt = state.attempts;
            state.attempts += 1;
            if let Some(pos) = state.faults.iter().position(|(at, _)| *at == attempt) {
                return Err(state.faults.remove(pos).1);
            }
            state.config.realtime
        };
        if realtime {
            thread::sleep(Duration::from_micros(self.integration_time as u64));
        }

        let mut state = lock(&self.state);
        let frame = match state.scripted.pop_front() {
            Some(frame) => frame,
            None => state.frame(self.integration_time),
        };
        state.reads += 1;
        Ok(frame)
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
