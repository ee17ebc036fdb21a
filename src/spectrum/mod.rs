//! # Spectrum Data Model
//!
//! A [`Spectrum`] is the immutable record of one acquisition or one derived
//! (calibrated) result:
//!
//! - `scan_number`: session-unique, assigned at acquisition time
//! - `integration_time`: exposure in microseconds
//! - `timestamp`: acquisition wall-clock instant
//! - `wavelengths`: strictly increasing, shared by every spectrum of a device session
//! - `counts`: one value per wavelength, possibly undefined for derived spectra
//! - `spectrum_type`: sample, reference, dark, absorbance or transmission
//! - `comments`: free-text annotation
//!
//! `wavelengths.len() == counts.len()` is checked on construction; a mismatch
//! is an error, never a truncation.

mod spectrum_impl;
mod types;
mod values;


pub use spectrum_impl::{Spectrum, SpectrumBuilder};
pub use types::{Slot, SpectrumType};
pub use values::SpectralValues;
