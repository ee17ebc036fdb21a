use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use log::{info, warn};

use crate::error::SpectrometerError;
use crate::spectrum::{SpectralValues, Spectrum, SpectrumType};

/// One calibrated result, borrowed from the spectrum that produced it
#[derive(Debug, Clone, Copy)]
pub struct RenderFrame<'a> {
    /// Shared wavelength axis
    pub wavelengths: &'a Arc<[f64]>,
    /// Calibrated values; undefined points are `None`
    pub values: &'a SpectralValues,
    /// Absorbance or transmission
    pub spectrum_type: SpectrumType,
    /// Scan number of the underlying sample
    pub scan_number: u64,
}

impl<'a> RenderFrame<'a> {
    /// Frame view of a spectrum
    pub fn from_spectrum(spectrum: &'a Spectrum) -> Self {
        Self {
            wavelengths: spectrum.wavelength_axis(),
            values: spectrum.counts(),
            spectrum_type: spectrum.spectrum_type(),
            scan_number: spectrum.scan_number(),
        }
    }

    /// Copy the frame so it can cross a thread boundary
    pub fn to_owned_frame(&self) -> OwnedRenderFrame {
        OwnedRenderFrame {
            wavelengths: Arc::clone(self.wavelengths),
            values: self.values.clone(),
            spectrum_type: self.spectrum_type,
            scan_number: self.scan_number,
        }
    }
}

/// Owned copy of a [`RenderFrame`]
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedRenderFrame {
    /// Shared wavelength axis
    pub wavelengths: Arc<[f64]>,
    /// Calibrated values
    pub values: SpectralValues,
    /// Absorbance or transmission
    pub spectrum_type: SpectrumType,
    /// Scan number of the underlying sample
    pub scan_number: u64,
}

/// Message sent by [`ChannelRenderer`]
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    /// A new calibrated frame
    Frame(OwnedRenderFrame),
    /// A skipped iteration and why
    Error(String),
}

/// Display collaborator of the monitoring loop. It never calls back into the
/// controller.
pub trait SpectrumRenderer {
    /// Show a calibrated frame
    fn render(&mut self, frame: &RenderFrame<'_>);

    /// Show a transient failure; the loop keeps running afterwards
    fn report_error(&mut self, error: &SpectrometerError) {
        warn!("Acquisition failed: {}", error);
    }
}

impl<F> SpectrumRenderer for F
where
    F: FnMut(&RenderFrame<'_>),
{
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self(frame)
    }
}

/// Forwards owned frames to a plotting thread.
///
/// Frames are dropped, never blocked on, when the channel is full, and a
/// disconnected receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    sender: Sender<RenderEvent>,
    dropped: usize,
}

impl ChannelRenderer {
    /// Wrap a sender
    pub fn new(sender: Sender<RenderEvent>) -> Self {
        Self { sender, dropped: 0 }
    }

    /// Number of events that could not be delivered
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn send(&mut self, event: RenderEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
            }
        }
    }
}

impl SpectrumRenderer for ChannelRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        self.send(RenderEvent::Frame(frame.to_owned_frame()));
    }

    fn report_error(&mut self, error: &SpectrometerError) {
        self.send(RenderEvent::Error(error.to_string()));
    }
}

/// Logs one line per frame: scan number and value range
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl SpectrumRenderer for LogRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        let undefined = frame.values.undefined_count();
        match frame.values.range() {
            Some((min, max)) => info!(
                "Scan {} {}: {} points, range {:.4} to {:.4}, {} undefined",
                frame.scan_number,
                frame.spectrum_type,
                frame.values.len(),
                min,
                max,
                undefined
            ),
            None => info!(
                "Scan {} {}: all {} points undefined",
                frame.scan_number,
                frame.spectrum_type,
                frame.values.len()
            ),
        }
    }
}
