use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{SpectralValues, SpectrumType};
use crate::error::SpectrometerError;

/// One acquired or derived spectrum. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    scan_number: u64,
    integration_time: u32,
    timestamp: DateTime<Utc>,
    wavelengths: Arc<[f64]>,
    counts: SpectralValues,
    spectrum_type: SpectrumType,
    comments: String,
}

impl Spectrum {
    /// Create a spectrum, validating array alignment and the wavelength axis.
    pub fn new(
        scan_number: u64,
        integration_time: u32,
        timestamp: DateTime<Utc>,
        wavelengths: Arc<[f64]>,
        counts: SpectralValues,
        spectrum_type: SpectrumType,
        comments: String,
    ) -> Result<Self, SpectrometerError> {
        if wavelengths.len() != counts.len() {
            return Err(SpectrometerError::ArrayLengthMismatch {
                wavelength_len: wavelengths.len(),
                counts_len: counts.len(),
            });
        }
        if wavelengths.is_empty() {
            return Err(SpectrometerError::InvalidParameter(
                "spectrum has no data points".to_string(),
            ));
        }
        if integration_time == 0 {
            return Err(SpectrometerError::InvalidParameter(
                "integration time must be positive".to_string(),
            ));
        }
        validate_wavelengths(&wavelengths)?;

        Ok(Self {
            scan_number,
            integration_time,
            timestamp,
            wavelengths,
            counts,
            spectrum_type,
            comments,
        })
    }

    /// Session-unique scan number
    pub fn scan_number(&self) -> u64 {
        self.scan_number
    }

    /// Exposure in microseconds
    pub fn integration_time(&self) -> u32 {
        self.integration_time
    }

    /// Acquisition instant
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Wavelength axis in nm
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Shared handle to the wavelength axis
    pub fn wavelength_axis(&self) -> &Arc<[f64]> {
        &self.wavelengths
    }

    /// Per-wavelength values
    pub fn counts(&self) -> &SpectralValues {
        &self.counts
    }

    /// Role of this spectrum
    pub fn spectrum_type(&self) -> SpectrumType {
        self.spectrum_type
    }

    /// Free-text annotation
    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Number of data points
    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    /// Always false for a constructed spectrum
    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Returns true if both spectra are on the same wavelength axis.
    pub fn shares_axis_with(&self, other: &Spectrum) -> bool {
        Arc::ptr_eq(&self.wavelengths, &other.wavelengths)
            || self.wavelengths[..] == other.wavelengths[..]
    }
}

fn validate_wavelengths(wavelengths: &[f64]) -> Result<(), SpectrometerError> {
    if let Some(i) = wavelengths.iter().position(|w| !w.is_finite()) {
        return Err(SpectrometerError::InvalidParameter(format!(
            "wavelength at index {} is not finite",
            i
        )));
    }
    if let Some(i) = wavelengths.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SpectrometerError::InvalidParameter(format!(
            "wavelengths not strictly increasing at index {}",
            i + 1
        )));
    }
    Ok(())
}

/// Builder for [`Spectrum`]; the final `build` performs all validation.
#[derive(Debug, Clone)]
pub struct SpectrumBuilder {
    scan_number: u64,
    spectrum_type: SpectrumType,
    integration_time: u32,
    timestamp: Option<DateTime<Utc>>,
    wavelengths: Arc<[f64]>,
    counts: SpectralValues,
    comments: String,
}

impl SpectrumBuilder {
    /// Start a spectrum with the given scan number and type
    pub fn new(scan_number: u64, spectrum_type: SpectrumType) -> Self {
        Self {
            scan_number,
            spectrum_type,
            integration_time: 0,
            timestamp: None,
            wavelengths: Arc::from(Vec::<f64>::new()),
            counts: SpectralValues::Dense(Vec::new()),
            comments: String::new(),
        }
    }

    /// Set the integration time in microseconds
    pub fn integration_time(mut self, micros: u32) -> Self {
        self.integration_time = micros;
        self
    }

    /// Set the acquisition instant (defaults to now)
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the wavelength axis
    pub fn wavelengths(mut self, wavelengths: impl Into<Arc<[f64]>>) -> Self {
        self.wavelengths = wavelengths.into();
        self
    }

    /// Set fully defined counts
    pub fn counts(mut self, counts: Vec<f64>) -> Self {
        self.counts = SpectralValues::Dense(counts);
        self
    }

    /// Set counts that may contain undefined points
    pub fn values(mut self, values: SpectralValues) -> Self {
        self.counts = values;
        self
    }

    /// Set the comments
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Validate and build the spectrum
    pub fn build(self) -> Result<Spectrum, SpectrometerError> {
        Spectrum::new(
            self.scan_number,
            self.integration_time,
            self.timestamp.unwrap_or_else(Utc::now),
            self.wavelengths,
            self.counts,
            self.spectrum_type,
            self.comments,
        )
    }
}
