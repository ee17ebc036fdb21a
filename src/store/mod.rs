//! # Spectrum Store
//!
//! Append-only history of every spectrum acquired or loaded during a session,
//! plus three slot pointers (`current`, `reference`, `dark`) into that
//! history. Slots are indices, never copies: repointing a slot is O(1) and
//! never mutates or removes a history entry.
//!
//! The store also owns the session-global scan counter, so scan numbers stay
//! unique and strictly increasing even when a slot is overwritten.

mod description;
mod manifest;

#[cfg(test)]
mod tests;

pub use description::{SpectrumSummary, StoreDescription};
pub use manifest::{Manifest, ManifestEntry, MANIFEST_FILE_NAME};

use log::{debug, warn};

use crate::error::SpectrometerError;
use crate::spectrum::{Slot, Spectrum};

/// History of spectra with calibration slot pointers.
///
/// Entries are added only by the controller, which owns scan numbering:
///
/// ```compile_fail
/// use microspec::prelude::*;
///
/// fn forge(store: &mut SpectrumStore, spectrum: Spectrum) {
///     store.append(spectrum);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpectrumStore {
    history: Vec<Spectrum>,
    current_index: Option<usize>,
    reference_index: Option<usize>,
    dark_index: Option<usize>,
    next_scan_number: u64,
}

impl SpectrumStore {
    /// Create an empty store whose first scan number is 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next scan number. Numbers are never handed out twice.
    pub fn allocate_scan_number(&mut self) -> u64 {
        let scan_number = self.next_scan_number;
        self.next_scan_number += 1;
        scan_number
    }

    /// Scan number the next acquisition will receive
    pub fn peek_scan_number(&self) -> u64 {
        self.next_scan_number
    }

    /// Append to history without touching any slot. Returns the history index.
    pub(crate) fn push(&mut self, spectrum: Spectrum) -> usize {
        if spectrum.scan_number() >= self.next_scan_number {
            self.next_scan_number = spectrum.scan_number() + 1;
        }
        debug!(
            "Stored scan {} ({}) at history index {}",
            spectrum.scan_number(),
            spectrum.spectrum_type(),
            self.history.len()
        );
        self.history.push(spectrum);
        self.history.len() - 1
    }

    /// Append to history and repoint the slot matching the spectrum type.
    ///
    /// Derived types (absorbance, transmission) are history-only.
    pub(crate) fn append(&mut self, spectrum: Spectrum) -> usize {
        let slot = spectrum.spectrum_type().slot();
        let index = self.push(spectrum);
        if let Some(slot) = slot {
            *self.slot_mut(slot) = Some(index);
        }
        index
    }

    /// Repoint `slot` to an existing history entry
    pub fn set_slot(&mut self, slot: Slot, index: usize) -> Result<(), SpectrometerError> {
        let spectrum = self.get(index)?;
        if !spectrum.spectrum_type().is_raw() {
            return Err(SpectrometerError::InvalidParameter(format!(
                "history entry {} is a derived {} spectrum and cannot be used as {}",
                index,
                spectrum.spectrum_type(),
                slot
            )));
        }
        if let Some(previous) = self.slot_index(slot) {
            if previous != index {
                warn!("Slot {} moved from history index {} to {}", slot, previous, index);
            }
        }
        *self.slot_mut(slot) = Some(index);
        Ok(())
    }

    /// History index a slot points at
    pub fn slot_index(&self, slot: Slot) -> Option<usize> {
        match slot {
            Slot::Current => self.current_index,
            Slot::Reference => self.reference_index,
            Slot::Dark => self.dark_index,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<usize> {
        match slot {
            Slot::Current => &mut self.current_index,
            Slot::Reference => &mut self.reference_index,
            Slot::Dark => &mut self.dark_index,
        }
    }

    /// Spectrum a slot points at, if set
    pub fn slot(&self, slot: Slot) -> Option<&Spectrum> {
        self.slot_index(slot).and_then(|i| self.history.get(i))
    }

    /// Spectrum a slot points at, or `SlotNotSet`
    pub fn require(&self, slot: Slot) -> Result<&Spectrum, SpectrometerError> {
        self.slot(slot).ok_or(SpectrometerError::SlotNotSet(slot))
    }

    /// History entry at `index`
    pub fn get(&self, index: usize) -> Result<&Spectrum, SpectrometerError> {
        self.history
            .get(index)
            .ok_or(SpectrometerError::IndexOutOfRange {
                index,
                len: self.history.len(),
            })
    }

    /// Resolve the reference: an explicit history index, else the active slot
    pub fn resolve_reference(
        &self,
        ref_spec_index: Option<usize>,
    ) -> Result<&Spectrum, SpectrometerError> {
        match ref_spec_index {
            Some(index) => self.get(index),
            None => self.require(Slot::Reference),
        }
    }

    /// Number of history entries
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Iterate over history in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Spectrum> {
        self.history.iter()
    }

    /// Most recently appended spectrum
    pub fn last(&self) -> Option<&Spectrum> {
        self.history.last()
    }

    /// Tabular summary of the history (scan, time, type, comments, slots)
    pub fn describe(&self) -> StoreDescription {
        let rows = self
            .history
            .iter()
            .enumerate()
            .map(|(index, spectrum)| SpectrumSummary {
                index,
                scan_number: spectrum.scan_number(),
                timestamp: spectrum.timestamp(),
                spectrum_type: spectrum.spectrum_type(),
                comments: spectrum.comments().to_string(),
                slots: Slot::ALL
                    .into_iter()
                    .filter(|slot| self.slot_index(*slot) == Some(index))
                    .collect(),
            })
            .collect();
        StoreDescription { rows }
    }
}
