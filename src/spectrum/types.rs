use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpectrometerError;

/// Role of a spectrum in the calibration pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumType {
    /// Raw scan of the sample under test
    Sample,
    /// Raw scan of the blank / lamp reference
    Reference,
    /// Raw scan with the light path blocked
    Dark,
    /// Derived: -log10 of the dark-corrected ratio
    Absorbance,
    /// Derived: dark-corrected ratio in percent
    Transmission,
}

impl SpectrumType {
    /// Canonical lowercase name, as written to file headers
    pub fn as_str(&self) -> &'static str {
        match self {
            SpectrumType::Sample => "sample",
            SpectrumType::Reference => "reference",
            SpectrumType::Dark => "dark",
            SpectrumType::Absorbance => "absorbance",
            SpectrumType::Transmission => "transmission",
        }
    }

    /// Returns true for types produced by the device rather than by calibration.
    pub fn is_raw(&self) -> bool {
        matches!(
            self,
            SpectrumType::Sample | SpectrumType::Reference | SpectrumType::Dark
        )
    }

    /// The slot this type updates when stored, if any.
    pub fn slot(&self) -> Option<Slot> {
        match self {
            SpectrumType::Sample => Some(Slot::Current),
            SpectrumType::Reference => Some(Slot::Reference),
            SpectrumType::Dark => Some(Slot::Dark),
            SpectrumType::Absorbance | SpectrumType::Transmission => None,
        }
    }
}

impl fmt::Display for SpectrumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpectrumType {
    type Err = SpectrometerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" | "current" | "current_spectrum" => Ok(SpectrumType::Sample),
            "reference" => Ok(SpectrumType::Reference),
            "dark" => Ok(SpectrumType::Dark),
            "absorbance" => Ok(SpectrumType::Absorbance),
            "transmission" => Ok(SpectrumType::Transmission),
            other => Err(SpectrometerError::InvalidParameter(format!(
                "unknown spectrum type '{}'",
                other
            ))),
        }
    }
}

/// Named pointer into the store history used by calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Most recent sample
    Current,
    /// Active reference
    Reference,
    /// Active dark
    Dark,
}

impl Slot {
    /// All slots, in display order
    pub const ALL: [Slot; 3] = [Slot::Current, Slot::Reference, Slot::Dark];

    /// Slot for a spectrum type, or `UnsupportedSlotType`
    pub fn for_type(spectrum_type: SpectrumType) -> Result<Self, SpectrometerError> {
        spectrum_type
            .slot()
            .ok_or(SpectrometerError::UnsupportedSlotType(spectrum_type))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Current => write!(f, "current"),
            Slot::Reference => write!(f, "reference"),
            Slot::Dark => write!(f, "dark"),
        }
    }
}
