use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use microspec::calibration::{calibrate, CalibrationMode};
use microspec::spectrum::Spectrum;
use microspec::xy::{read_xy_file, save_spectrum};

/// Calibrate a sample file against reference and dark files
pub fn run(
    sample: PathBuf,
    reference: PathBuf,
    dark: PathBuf,
    mode: CalibrationMode,
    output: Option<PathBuf>,
) -> Result<()> {
    let sample_spectrum = load(&sample)?;
    let reference_spectrum = load(&reference)?;
    let dark_spectrum = load(&dark)?;

    let result = calibrate(mode, &sample_spectrum, &reference_spectrum, &dark_spectrum)
        .context("Calibration failed")?;

    let output = output.unwrap_or_else(|| default_output(&sample, mode));
    save_spectrum(&output, &result)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Calibration complete!");
    info!("  Mode: {}", mode);
    info!("  Points: {}", result.len());
    info!("  Undefined points: {}", result.counts().undefined_count());
    println!("{}", output.display());
    Ok(())
}

fn load(path: &Path) -> Result<Spectrum> {
    read_xy_file(path)
        .and_then(|doc| doc.into_spectrum())
        .with_context(|| format!("Failed to load {}", path.display()))
}

/// `<sample stem>_<mode>.xy` next to the sample
fn default_output(sample: &Path, mode: CalibrationMode) -> PathBuf {
    let stem = sample
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample".to_string());
    sample.with_file_name(format!("{}_{}.xy", stem, mode))
}
