//! Error types for spectrometer control and spectrum handling

use crate::spectrum::{Slot, SpectrumType};

/// Errors that can occur while driving the spectrometer or handling spectra
#[derive(Debug, thiserror::Error)]
pub enum SpectrometerError {
    /// No spectrometer was found during enumeration
    #[error("No spectrometer found")]
    NoDeviceFound,

    /// The device is already bound by another session
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// Hardware or driver failure; fatal to any running monitoring loop
    #[error("Device I/O error: {0}")]
    DeviceIoError(String),

    /// A raw acquisition did not complete in time; retryable
    #[error("Acquisition timed out: {0}")]
    AcquisitionTimeout(String),

    /// Invalid parameter (integration time, scan count, spectrum type)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sample, reference and dark spectra do not share a wavelength calibration
    #[error("Incompatible spectra: {0}")]
    IncompatibleSpectra(String),

    /// A calibration slot was requested before it was assigned
    #[error("Slot not set: {0}")]
    SlotNotSet(Slot),

    /// A spectrum file could not be parsed
    #[error("Malformed file at line {line}: {reason}")]
    MalformedFile {
        /// 1-based line number (0 when the problem is not tied to a line)
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// The spectrum type has no slot for this operation
    #[error("Unsupported slot type: {0}")]
    UnsupportedSlotType(SpectrumType),

    /// History index outside the store
    #[error("Index {index} out of range for history of {len} spectra")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of history entries
        len: usize,
    },

    /// The operation requires a connected device
    #[error("Spectrometer is not connected")]
    NotConnected,

    /// Wavelength and count arrays differ in length
    #[error("Array length mismatch: wavelength array has {wavelength_len} elements, counts array has {counts_len} elements")]
    ArrayLengthMismatch {
        /// Length of the wavelength array
        wavelength_len: usize,
        /// Length of the counts array
        counts_len: usize,
    },

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error serializing the session manifest
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SpectrometerError {
    /// Returns true for failures a monitoring loop may skip over.
    pub fn is_transient(&self) -> bool {
        matches!(self, SpectrometerError::AcquisitionTimeout(_))
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        SpectrometerError::MalformedFile {
            line,
            reason: reason.into(),
        }
    }
}
