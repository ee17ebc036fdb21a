//! # Monitoring Loop
//!
//! Repeatedly acquires a sample, calibrates it against a fixed dark and
//! reference, and hands the result to a [`SpectrumRenderer`]:
//!
//! ```text
//!  ┌──────────┐   ┌───────────┐   ┌────────┐   ┌───────┐
//!  │ acquire  │──▶│ calibrate │──▶│ render │──▶│ sleep │──┐
//!  └──────────┘   └───────────┘   └────────┘   └───────┘  │
//!       ▲                                                 │
//!       └──────────────── unless stopped ─────────────────┘
//! ```
//!
//! Iterations run strictly one after another on the calling thread. A
//! [`StopToken`] is polled at the top of every iteration and during the
//! inter-iteration wait, so a stop never interrupts an acquisition halfway.
//!
//! An [`AcquisitionTimeout`](SpectrometerError::AcquisitionTimeout) is
//! reported to the renderer and the loop moves on; any other failure ends the
//! loop and is returned to the caller.

mod renderer;


pub use renderer::{
    ChannelRenderer, LogRenderer, OwnedRenderFrame, RenderEvent, RenderFrame, SpectrumRenderer,
};

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::calibration::{calibrate, CalibrationMode};
use crate::error::SpectrometerError;
use crate::spectrum::Spectrum;

/// Longest uninterrupted sleep between two polls of the stop flag
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Cloneable cancellation flag shared between the loop and its controller
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a token in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop at its next poll
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`stop`](Self::stop) has been called on any clone
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early if stopped. Returns true if stopped.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep((deadline - now).min(STOP_POLL_INTERVAL));
        }
    }
}

/// Settings of one monitoring run
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Calibrated quantity to display
    pub mode: CalibrationMode,
    /// Wait between the end of one iteration and the start of the next
    pub update_interval: Duration,
    /// Raw reads averaged per sample
    pub number_of_scans: usize,
    /// History index of the reference; `None` uses the reference slot
    pub reference_index: Option<usize>,
    /// Write every calibrated result to the experiment directory
    pub save: bool,
    /// Upper bound on iterations, failed ones included
    pub max_iterations: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::Absorbance,
            update_interval: Duration::from_millis(500),
            number_of_scans: 1,
            reference_index: None,
            save: false,
            max_iterations: None,
        }
    }
}

impl MonitorConfig {
    /// Absorbance monitoring at the given refresh interval
    pub fn absorbance(update_interval: Duration) -> Self {
        Self {
            update_interval,
            ..Default::default()
        }
    }

    /// Transmission monitoring at the given refresh interval
    pub fn transmission(update_interval: Duration) -> Self {
        Self {
            mode: CalibrationMode::Transmission,
            update_interval,
            ..Default::default()
        }
    }

    /// Calibrate against a specific history entry instead of the reference slot
    pub fn with_reference_index(mut self, reference_index: Option<usize>) -> Self {
        self.reference_index = reference_index;
        self
    }

    /// Stop after at most `max_iterations` iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Check the configuration before the first acquisition
    pub fn validate(&self) -> Result<(), SpectrometerError> {
        if self.number_of_scans == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "monitoring needs at least 1 scan per iteration".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the loop gets its samples from and where it saves results
pub trait SampleSource {
    /// Acquire one averaged sample spectrum with a fresh scan number.
    ///
    /// The spectrum must not be stored in the session history.
    fn acquire_sample(&mut self, number_of_scans: usize) -> Result<Spectrum, SpectrometerError>;

    /// Persist a calibrated result, returning the written path
    fn persist(&mut self, spectrum: &Spectrum) -> Result<PathBuf, SpectrometerError>;
}

/// Statistics from a finished monitoring run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Iterations started (successful or not)
    pub iterations: usize,
    /// Frames handed to the renderer
    pub renders: usize,
    /// Acquisitions skipped after a timeout
    pub transient_failures: usize,
}

impl fmt::Display for MonitorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations, {} frames rendered, {} transient failures",
            self.iterations, self.renders, self.transient_failures
        )
    }
}

/// Run the monitoring loop until `stop` is set, `max_iterations` is reached,
/// or a non-transient error occurs.
pub fn run<S, R>(
    source: &mut S,
    reference: &Spectrum,
    dark: &Spectrum,
    config: &MonitorConfig,
    stop: &StopToken,
    renderer: &mut R,
) -> Result<MonitorSummary, SpectrometerError>
where
    S: SampleSource + ?Sized,
    R: SpectrumRenderer + ?Sized,
{
    config.validate()?;
    if !reference.shares_axis_with(dark) {
        return Err(SpectrometerError::IncompatibleSpectra(format!(
            "reference scan {} ({} wavelengths) and dark scan {} ({} wavelengths) are on different axes",
            reference.scan_number(),
            reference.len(),
            dark.scan_number(),
            dark.len()
        )));
    }
    info!(
        "Monitoring {} against reference scan {} and dark scan {} every {:?}",
        config.mode,
        reference.scan_number(),
        dark.scan_number(),
        config.update_interval
    );

    let mut summary = MonitorSummary::default();
    let mut last_scan: Option<u64> = None;

    loop {
        if stop.is_stopped() {
            debug!("Stop requested before iteration {}", summary.iterations);
            break;
        }
        if config.max_iterations.is_some_and(|max| summary.iterations >= max) {
            debug!("Reached {} iterations", summary.iterations);
            break;
        }
        summary.iterations += 1;

        let sample = match source.acquire_sample(config.number_of_scans) {
            Ok(sample) => sample,
            Err(err) if err.is_transient() => {
                warn!("Skipping iteration {}: {}", summary.iterations, err);
                summary.transient_failures += 1;
                renderer.report_error(&err);
                if stop.sleep(config.update_interval) {
                    break;
                }
                continue;
            }
            Err(err) => {
                warn!("Monitoring aborted after {} iterations: {}", summary.iterations, err);
                return Err(err);
            }
        };

        if let Some(previous) = last_scan {
            if sample.scan_number() <= previous {
                return Err(SpectrometerError::InvalidParameter(format!(
                    "sample source returned scan {} after scan {}",
                    sample.scan_number(),
                    previous
                )));
            }
        }
        last_scan = Some(sample.scan_number());

        let calibrated = calibrate(config.mode, &sample, reference, dark)?;
        renderer.render(&RenderFrame::from_spectrum(&calibrated));
        summary.renders += 1;

        if config.save {
            let path = source.persist(&calibrated)?;
            debug!("Saved scan {} to {}", calibrated.scan_number(), path.display());
        }

        if stop.sleep(config.update_interval) {
            break;
        }
    }

    info!("Monitoring finished: {}", summary);
    Ok(summary)
}
