use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use log::info;
use std::path::PathBuf;
use std::thread;

use microspec::calibration::CalibrationMode;
use microspec::config::SpectrometerConfig;
use microspec::controller::Microspectrometer;
use microspec::device::simulated::{Absorber, SimulatedDriver};
use microspec::acquisition::AcquisitionRequest;
use microspec::monitor::{ChannelRenderer, RenderEvent, StopToken};

use super::Config;

/// Monitoring iterations when neither the flag nor the config file sets one
const DEFAULT_ITERATIONS: usize = 5;

/// Frames buffered between the loop and the display thread
const RENDER_BUFFER: usize = 16;

/// Run a complete simulated session
pub fn run(
    output: PathBuf,
    iterations: Option<usize>,
    preset: SpectrometerConfig,
    mode: Option<CalibrationMode>,
    file_config: &Config,
) -> Result<()> {
    info!("microspec - Simulated Microspectrometer Demo");
    info!("============================================");

    let mut config = file_config.apply(preset);
    config.experiment_dir = Some(output.clone());
    let iterations = iterations
        .or(file_config.monitor.iterations)
        .unwrap_or(DEFAULT_ITERATIONS);
    let mode = mode.or(file_config.monitor.mode).unwrap_or_default();

    let driver = SimulatedDriver::default();
    let controls = driver.controls();
    let mut spec = Microspectrometer::new(driver, config.clone())
        .context("Invalid session configuration")?;

    spec.connect().context("Failed to connect to the simulated spectrometer")?;
    spec.start_new_experiment(Some(&output))
        .with_context(|| format!("Failed to create {}", output.display()))?;
    info!("Experiment directory: {}", output.display());

    let scans = config.number_of_scans;

    controls.set_shutter_closed(true);
    let dark = spec
        .measure(AcquisitionRequest::dark().scans(scans).save_as(None).comments("shutter closed"))
        .context("Dark acquisition failed")?;
    controls.set_shutter_closed(false);
    info!("  Dark: scan {} ({} scans averaged)", dark.scan_number(), scans);

    let reference = spec
        .measure(AcquisitionRequest::reference().scans(scans).save_as(None).comments("blank cuvette"))
        .context("Reference acquisition failed")?;
    info!("  Reference: scan {}", reference.scan_number());

    controls.set_absorber(Some(Absorber::default()));
    let sample = spec
        .measure(AcquisitionRequest::sample().scans(scans).save_as(None).comments("dye, 520 nm band"))
        .context("Sample acquisition failed")?;
    info!("  Sample: scan {}", sample.scan_number());

    let path = spec
        .save_calibrated(CalibrationMode::Absorbance, None, None)
        .context("Failed to save absorbance")?;
    info!("  Absorbance written to {}", path.display());

    info!("Monitoring {} for {} iterations...", mode, iterations);
    let (sender, receiver) = bounded::<RenderEvent>(RENDER_BUFFER);
    let display = thread::spawn(move || {
        for event in receiver {
            match event {
                RenderEvent::Frame(frame) => {
                    let (min, max) = frame.values.range().unwrap_or((f64::NAN, f64::NAN));
                    println!(
                        "scan {:>4}  {:<12}  min {:>9.4}  max {:>9.4}  undefined {}",
                        frame.scan_number,
                        frame.spectrum_type,
                        min,
                        max,
                        frame.values.undefined_count()
                    );
                }
                RenderEvent::Error(message) => println!("skipped: {}", message),
            }
        }
    });

    let monitor_config = spec
        .config()
        .monitor_config(mode)
        .with_max_iterations(iterations);
    let mut renderer = ChannelRenderer::new(sender);
    let summary = spec
        .monitor(&monitor_config, &StopToken::new(), &mut renderer)
        .context("Monitoring failed")?;
    drop(renderer);
    if display.join().is_err() {
        anyhow::bail!("Display thread panicked");
    }
    info!("  {}", summary);

    println!();
    println!("{}", spec.describe_all_spectra());

    let stats = spec.save_all_spectra().context("Failed to save session")?;
    info!("{}", stats);
    info!("  Manifest: {}", stats.manifest_path.display());

    spec.disconnect().context("Failed to disconnect")?;
    info!("Demo complete!");
    Ok(())
}
