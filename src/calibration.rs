//! # Calibration Engine
//!
//! Combines a sample with a dark and a reference spectrum recorded on the same
//! wavelength axis:
//!
//! ```text
//! transmission[i] = 100 * (sample[i] - dark[i]) / (reference[i] - dark[i])
//! absorbance[i]   = -log10(transmission[i] / 100)
//! ```
//!
//! Numeric edge cases never abort the spectrum. A point is undefined when any
//! input is undefined there, when `reference - dark <= 0`, or when the result
//! is not finite; absorbance is also undefined wherever the ratio is `<= 0`.
//! Mismatched wavelength axes are an error: there is no implicit interpolation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SpectrometerError;
use crate::spectrum::{SpectralValues, Spectrum, SpectrumBuilder, SpectrumType};

/// Which calibrated quantity to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationMode {
    /// -log10 of the dark-corrected ratio
    #[default]
    Absorbance,
    /// Dark-corrected ratio in percent
    Transmission,
}

impl CalibrationMode {
    /// Spectrum type of the calibrated output
    pub fn spectrum_type(&self) -> SpectrumType {
        match self {
            CalibrationMode::Absorbance => SpectrumType::Absorbance,
            CalibrationMode::Transmission => SpectrumType::Transmission,
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spectrum_type())
    }
}

/// Percent transmission of `sample` against `reference`, dark-corrected
pub fn transmission(
    sample: &Spectrum,
    reference: &Spectrum,
    dark: &Spectrum,
) -> Result<Spectrum, SpectrometerError> {
    calibrate(CalibrationMode::Transmission, sample, reference, dark)
}

/// Absorbance (log10 units) of `sample` against `reference`, dark-corrected
pub fn absorbance(
    sample: &Spectrum,
    reference: &Spectrum,
    dark: &Spectrum,
) -> Result<Spectrum, SpectrometerError> {
    calibrate(CalibrationMode::Absorbance, sample, reference, dark)
}

/// Compute the calibrated spectrum for `mode`.
///
/// The result inherits scan number, timestamp and integration time from
/// `sample`; its comments record which dark and reference scans were used.
pub fn calibrate(
    mode: CalibrationMode,
    sample: &Spectrum,
    reference: &Spectrum,
    dark: &Spectrum,
) -> Result<Spectrum, SpectrometerError> {
    check_axis(sample, reference, "reference")?;
    check_axis(sample, dark, "dark")?;

    let sample_counts = sample.counts();
    let reference_counts = reference.counts();
    let dark_counts = dark.counts();

    let values = (0..sample.len()).map(|i| {
        let s = sample_counts.get(i)?;
        let r = reference_counts.get(i)?;
        let d = dark_counts.get(i)?;
        let ratio = dark_corrected_ratio(s, r, d)?;
        match mode {
            CalibrationMode::Transmission => finite(100.0 * ratio),
            CalibrationMode::Absorbance => ratio_to_absorbance(ratio),
        }
    });
    let values = SpectralValues::from_options(values);

    SpectrumBuilder::new(sample.scan_number(), mode.spectrum_type())
        .integration_time(sample.integration_time())
        .timestamp(sample.timestamp())
        .wavelengths(sample.wavelength_axis().clone())
        .values(values)
        .comments(format!(
            "{} of scan {} (dark: scan {}, reference: scan {})",
            mode,
            sample.scan_number(),
            dark.scan_number(),
            reference.scan_number()
        ))
        .build()
}

/// `(sample - dark) / (reference - dark)`, undefined for a non-positive denominator
pub fn dark_corrected_ratio(sample: f64, reference: f64, dark: f64) -> Option<f64> {
    let denominator = reference - dark;
    if denominator.is_nan() || denominator <= 0.0 {
        return None;
    }
    finite((sample - dark) / denominator)
}

/// `-log10(ratio)`, undefined for a non-positive ratio
pub fn ratio_to_absorbance(ratio: f64) -> Option<f64> {
    if ratio.is_nan() || ratio <= 0.0 {
        return None;
    }
    finite(-ratio.log10())
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn check_axis(sample: &Spectrum, other: &Spectrum, role: &str) -> Result<(), SpectrometerError> {
    if sample.shares_axis_with(other) {
        return Ok(());
    }
    Err(SpectrometerError::IncompatibleSpectra(format!(
        "sample scan {} has {} wavelengths, {} scan {} has {} wavelengths on a different axis",
        sample.scan_number(),
        sample.len(),
        role,
        other.scan_number(),
        other.len()
    )))
}
