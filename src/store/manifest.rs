//! Session manifest written next to the spectrum files by `save_all_spectra`.
//!
//! The manifest.json file lets a reader recover which files were the active
//! dark, reference and current spectra without parsing every header.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use uuid::Uuid;

use super::SpectrumStore;
use crate::error::SpectrometerError;
use crate::spectrum::{Slot, SpectrumType};

/// File name of the manifest inside an experiment directory
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// One saved history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// History index at save time
    pub index: usize,
    /// Scan number
    pub scan_number: u64,
    /// Spectrum type
    pub spectrum_type: SpectrumType,
    /// Integration time in microseconds
    pub integration_time_us: u32,
    /// Acquisition time
    pub timestamp: DateTime<Utc>,
    /// File name relative to the experiment directory
    pub file_name: String,
}

/// Summary of a session's saved spectra
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Session identifier
    pub session_id: Uuid,
    /// Device the session was bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// When the manifest was written
    pub created: DateTime<Utc>,
    /// Name and version of the writer
    pub writer: String,
    /// History index of each set slot
    pub slots: BTreeMap<String, usize>,
    /// Saved entries in history order
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build a manifest for `store`; `file_names[i]` is the file of history entry `i`.
    pub fn from_store(
        session_id: Uuid,
        device: Option<String>,
        store: &SpectrumStore,
        file_names: &[String],
    ) -> Self {
        let slots = Slot::ALL
            .into_iter()
            .filter_map(|slot| store.slot_index(slot).map(|i| (slot.to_string(), i)))
            .collect();

        let entries = store
            .iter()
            .zip(file_names)
            .enumerate()
            .map(|(index, (spectrum, file_name))| ManifestEntry {
                index,
                scan_number: spectrum.scan_number(),
                spectrum_type: spectrum.spectrum_type(),
                integration_time_us: spectrum.integration_time(),
                timestamp: spectrum.timestamp(),
                file_name: file_name.clone(),
            })
            .collect();

        Self {
            session_id,
            device,
            created: Utc::now(),
            writer: concat!("microspec ", env!("CARGO_PKG_VERSION")).to_string(),
            slots,
            entries,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String, SpectrometerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> Result<Self, SpectrometerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write `manifest.json` into `dir`, replacing any previous manifest atomically
    pub fn save(&self, dir: &Path) -> Result<PathBuf, SpectrometerError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE_NAME);
        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut out, self)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }
}
