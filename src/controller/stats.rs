use std::fmt;
use std::path::PathBuf;

/// Statistics from a completed `save_all_spectra`
#[derive(Debug, Clone)]
pub struct SaveAllStats {
    /// Number of spectrum files written
    pub files_written: usize,
    /// Total number of data rows written
    pub points_written: usize,
    /// Directory the files were written to
    pub directory: PathBuf,
    /// Path of the session manifest
    pub manifest_path: PathBuf,
}

impl fmt::Display for SaveAllStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Wrote {} spectra ({} points) to {}",
            self.files_written,
            self.points_written,
            self.directory.display()
        )
    }
}
