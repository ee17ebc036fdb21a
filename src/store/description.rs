use std::fmt;

use chrono::{DateTime, Local, Utc};

use crate::spectrum::{Slot, SpectrumType};

/// One row of [`StoreDescription`]
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSummary {
    /// History index
    pub index: usize,
    /// Scan number
    pub scan_number: u64,
    /// Acquisition time
    pub timestamp: DateTime<Utc>,
    /// Spectrum type
    pub spectrum_type: SpectrumType,
    /// Comments
    pub comments: String,
    /// Slots currently pointing at this entry
    pub slots: Vec<Slot>,
}

/// Overview of everything held in a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDescription {
    /// One row per history entry, in insertion order
    pub rows: Vec<SpectrumSummary>,
}

impl fmt::Display for StoreDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan\tDateTime\tSpectrumType\tSlots\tComment")?;
        for row in &self.rows {
            let slots = row
                .slots
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",");
            writeln!(
                f,
                "{}\t{}\t{}\t{}\t{}",
                row.scan_number,
                row.timestamp
                    .with_timezone(&Local)
                    .format("%m/%d/%Y %H:%M:%S"),
                row.spectrum_type,
                if slots.is_empty() { "-" } else { &slots },
                row.comments
            )?;
        }
        Ok(())
    }
}
