//! # Two-Column ASCII Spectrum Files (`.xy`)
//!
//! ```text
//! # Scan Number: 12
//! # Integration Time: 100000 microseconds
//! # Timestamp: 2026-10-19T09:41:07.123456Z
//! # Spectrum Type: reference
//! # Comments: cuvette 2, blank
//! 200.0	93.5
//! 200.34	94.25
//! ...
//! ```
//!
//! Metadata lines start with `#` and precede the data. Data rows hold a
//! wavelength and a count separated by whitespace, in strictly increasing
//! wavelength order; `nan` marks an undefined value. Headers written by the
//! legacy acquisition scripts (`Integration Time: 100000.00 microseconds.`,
//! `%m/%d/%Y %H:%M:%S` stamps, no timestamp at all) are accepted.

mod reader;
mod writer;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};

pub use reader::{parse_xy, read_xy, read_xy_file};
pub use writer::{default_file_name, save_spectrum, write_spectrum};

use crate::error::SpectrometerError;
use crate::spectrum::{SpectralValues, Spectrum, SpectrumBuilder, SpectrumType};

/// Header keys
pub(crate) mod keys {
    pub const SCAN_NUMBER: &str = "Scan Number";
    pub const INTEGRATION_TIME: &str = "Integration Time";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const SPECTRUM_TYPE: &str = "Spectrum Type";
    pub const COMMENTS: &str = "Comments";
}

/// File extension used for spectrum files
pub const XY_EXTENSION: &str = "xy";

/// Metadata recovered from the `#` header; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyHeader {
    /// Scan number recorded in the file
    pub scan_number: Option<u64>,
    /// Integration time in microseconds
    pub integration_time: Option<u32>,
    /// Acquisition time
    pub timestamp: Option<DateTime<Utc>>,
    /// Spectrum type
    pub spectrum_type: Option<SpectrumType>,
    /// Comments
    pub comments: Option<String>,
}

/// A parsed `.xy` file
#[derive(Debug, Clone, PartialEq)]
pub struct XyDocument {
    /// Header metadata
    pub header: XyHeader,
    /// Wavelength column, strictly increasing
    pub wavelengths: Vec<f64>,
    /// Value column
    pub values: SpectralValues,
}

impl XyDocument {
    /// Number of data rows
    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    /// Returns true if the file had no data rows
    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Convert to a spectrum using only what the file records.
    ///
    /// Missing fields fall back to scan 0, 1 us, the current time, `sample`
    /// and empty comments.
    pub fn into_spectrum(self) -> Result<Spectrum, SpectrometerError> {
        let scan_number = self.header.scan_number.unwrap_or(0);
        let integration_time = self.header.integration_time.unwrap_or(1);
        let spectrum_type = self.header.spectrum_type.unwrap_or(SpectrumType::Sample);
        self.into_spectrum_with(scan_number, integration_time, spectrum_type)
    }

    /// Convert to a spectrum with an explicit scan number and type.
    ///
    /// The recorded integration time wins over `fallback_integration_time`.
    pub fn into_spectrum_with(
        self,
        scan_number: u64,
        fallback_integration_time: u32,
        spectrum_type: SpectrumType,
    ) -> Result<Spectrum, SpectrometerError> {
        let mut builder = SpectrumBuilder::new(scan_number, spectrum_type)
            .integration_time(
                self.header
                    .integration_time
                    .unwrap_or(fallback_integration_time),
            )
            .wavelengths(self.wavelengths)
            .values(self.values)
            .comments(self.header.comments.unwrap_or_default());
        if let Some(timestamp) = self.header.timestamp {
            builder = builder.timestamp(timestamp);
        }
        builder.build()
    }
}
