use std::time::Duration;

use tempfile::tempdir;

use super::*;
use crate::device::simulated::{SimulatedControls, SimulatedDriver};
use crate::device::DriverError;
use crate::monitor::RenderFrame;

fn connected(pixels: usize) -> (Microspectrometer<SimulatedDriver>, SimulatedControls) {
    let driver = SimulatedDriver::with_pixels(pixels);
    let controls = driver.controls();
    let mut spec = Microspectrometer::new(driver, SpectrometerConfig::default()).unwrap();
    spec.connect().unwrap();
    (spec, controls)
}

#[test]
fn test_connect_and_disconnect() {
    let (mut spec, controls) = connected(4);
    assert_eq!(spec.state(), ConnectionState::Connected);
    assert_eq!(spec.wavelengths(), Some(&[400.0, 410.0, 420.0, 430.0][..]));
    assert!(controls.is_open());

    // Idempotent in both directions
    spec.connect().unwrap();
    spec.disconnect().unwrap();
    spec.disconnect().unwrap();
    assert_eq!(spec.state(), ConnectionState::Disconnected);
    assert!(!controls.is_open());
    assert!(spec.device().is_none());
}

#[test]
fn test_no_device_and_busy() {
    let driver = SimulatedDriver::with_pixels(4);
    let controls = driver.controls();
    let mut spec = Microspectrometer::new(driver, SpectrometerConfig::default()).unwrap();

    controls.set_present(false);
    assert!(matches!(spec.connect(), Err(SpectrometerError::NoDeviceFound)));

    controls.set_present(true);
    controls.set_busy(true);
    assert!(matches!(spec.connect(), Err(SpectrometerError::DeviceBusy(_))));
    assert_eq!(spec.state(), ConnectionState::Disconnected);
}

#[test]
fn test_operations_require_connection() {
    let mut spec =
        Microspectrometer::new(SimulatedDriver::with_pixels(4), SpectrometerConfig::default())
            .unwrap();
    assert!(matches!(
        spec.measure(AcquisitionRequest::sample()),
        Err(SpectrometerError::NotConnected)
    ));
    assert!(matches!(
        spec.change_integration_time(1000),
        Err(SpectrometerError::NotConnected)
    ));
}

#[test]
fn test_change_integration_time() {
    let (mut spec, _controls) = connected(4);
    assert!(matches!(
        spec.change_integration_time(0),
        Err(SpectrometerError::InvalidParameter(_))
    ));
    assert_eq!(spec.state(), ConnectionState::Connected);

    spec.change_integration_time(20_000).unwrap();
    assert_eq!(spec.integration_time(), 20_000);
    let dark = spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    assert_eq!(dark.integration_time(), 20_000);

    // Outside the simulated range: hardware rejection is a device fault
    assert!(matches!(
        spec.change_integration_time(10),
        Err(SpectrometerError::DeviceIoError(_))
    ));
    assert_eq!(spec.state(), ConnectionState::Error);
    assert_eq!(spec.integration_time(), 20_000);
}

#[test]
fn test_measure_averages_and_stores_once() {
    let (mut spec, controls) = connected(3);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();

    controls.push_frames(vec![
        vec![1.0, 10.0, 100.0],
        vec![3.0, 20.0, 200.0],
        vec![5.0, 30.0, 300.0],
        vec![7.0, 40.0, 400.0],
    ]);
    let before = spec.store().len();
    let sample = spec
        .measure(AcquisitionRequest::sample().scans(4).comments("four"))
        .unwrap();

    assert_eq!(spec.store().len(), before + 1);
    assert_eq!(sample.counts().as_dense(), Some(&[4.0, 25.0, 250.0][..]));
    assert_eq!(sample.comments(), "four");
    assert!(sample.scan_number() > spec.store().get(0).unwrap().scan_number());
    assert_eq!(spec.store().slot_index(Slot::Current), Some(before));
    assert!(Arc::ptr_eq(
        sample.wavelength_axis(),
        spec.store().get(0).unwrap().wavelength_axis()
    ));
}

#[test]
fn test_measure_without_store_still_consumes_scan_number() {
    let (mut spec, _controls) = connected(2);
    let first = spec
        .measure(AcquisitionRequest::sample().scans(1).store(false))
        .unwrap();
    let second = spec.measure(AcquisitionRequest::sample().scans(1)).unwrap();
    assert_eq!(spec.store().len(), 1);
    assert!(second.scan_number() > first.scan_number());
}

#[test]
fn test_measure_uses_configured_scan_count() {
    let driver = SimulatedDriver::with_pixels(2);
    let controls = driver.controls();
    let config = SpectrometerConfig {
        number_of_scans: 2,
        ..Default::default()
    };
    let mut spec = Microspectrometer::new(driver, config).unwrap();
    spec.connect().unwrap();

    controls.push_frames(vec![vec![10.0, 20.0], vec![30.0, 40.0]]);
    let sample = spec.measure(AcquisitionRequest::sample()).unwrap();
    assert_eq!(controls.reads(), 2);
    assert_eq!(sample.counts().get(0), Some(20.0));
    assert_eq!(sample.counts().get(1), Some(30.0));

    // An explicit count still wins
    spec.measure(AcquisitionRequest::dark().scans(3)).unwrap();
    assert_eq!(controls.reads(), 5);
}

#[test]
fn test_failed_measure_is_atomic() {
    let (mut spec, controls) = connected(2);
    controls.inject_fault_after(2, DriverError::Timeout("no trigger".into()));

    let result = spec.measure(AcquisitionRequest::reference().scans(4));
    assert!(matches!(result, Err(SpectrometerError::AcquisitionTimeout(_))));
    assert!(spec.store().is_empty());
    assert_eq!(spec.store().peek_scan_number(), 0);
    // Timeouts are transient: the session stays usable
    assert_eq!(spec.state(), ConnectionState::Connected);
}

#[test]
fn test_device_fault_enters_error_state_and_recovers() {
    let (mut spec, controls) = connected(2);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();

    controls.inject_fault(DriverError::Disconnected);
    assert!(matches!(
        spec.measure(AcquisitionRequest::sample().scans(1)),
        Err(SpectrometerError::DeviceIoError(_))
    ));
    assert_eq!(spec.state(), ConnectionState::Error);

    // Store stays readable, device operations are refused
    assert_eq!(spec.store().len(), 1);
    assert!(matches!(
        spec.measure(AcquisitionRequest::sample().scans(1)),
        Err(SpectrometerError::NotConnected)
    ));

    spec.disconnect().unwrap();
    assert_eq!(spec.state(), ConnectionState::Disconnected);
    spec.connect().unwrap();
    spec.measure(AcquisitionRequest::sample().scans(1)).unwrap();
    assert_eq!(spec.store().len(), 2);
}

#[test]
fn test_measure_rejects_derived_types_and_zero_scans() {
    let (mut spec, controls) = connected(2);
    assert!(matches!(
        spec.measure(AcquisitionRequest::new(SpectrumType::Transmission)),
        Err(SpectrometerError::InvalidParameter(_))
    ));
    assert!(matches!(
        spec.measure(AcquisitionRequest::sample().scans(0)),
        Err(SpectrometerError::InvalidParameter(_))
    ));
    assert_eq!(controls.reads(), 0);
}

#[test]
fn test_calibration_against_slots() {
    let (mut spec, controls) = connected(2);
    assert!(matches!(spec.absorbance(None), Err(SpectrometerError::SlotNotSet(_))));

    controls.push_frames(vec![
        vec![100.0, 100.0],
        vec![1000.0, 2000.0],
        vec![550.0, 1050.0],
    ]);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::sample().scans(1)).unwrap();

    let t = spec.transmission(None).unwrap();
    let a = spec.absorbance(Some(1)).unwrap();
    for i in 0..2 {
        assert!((t.counts().get(i).unwrap() - 50.0).abs() < 1e-9);
        assert!((a.counts().get(i).unwrap() - 0.30103).abs() < 1e-4);
    }
    assert_eq!(a.scan_number(), 2);
    // Calibrated results are not stored
    assert_eq!(spec.store().len(), 3);

    assert!(matches!(
        spec.absorbance(Some(9)),
        Err(SpectrometerError::IndexOutOfRange { index: 9, len: 3 })
    ));
}

#[test]
fn test_set_spectrum_repoints_slots() {
    let (mut spec, _controls) = connected(2);
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    assert_eq!(spec.store().slot_index(Slot::Reference), Some(1));

    spec.set_spectrum(SpectrumType::Reference, 0).unwrap();
    assert_eq!(spec.store().slot_index(Slot::Reference), Some(0));
    assert_eq!(spec.store().len(), 2);

    assert!(matches!(
        spec.set_spectrum(SpectrumType::Dark, 5),
        Err(SpectrometerError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        spec.set_spectrum(SpectrumType::Absorbance, 0),
        Err(SpectrometerError::UnsupportedSlotType(SpectrumType::Absorbance))
    ));
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let (mut spec, _controls) = connected(4);
    spec.start_new_experiment(Some(dir.path())).unwrap();

    let dark = spec
        .measure(AcquisitionRequest::dark().scans(2).save_as(None).comments("shutter"))
        .unwrap();
    assert!(dir.path().join("Scan_0_dark.xy").exists());

    let loaded = spec.load_spectrum(SpectrumType::Dark, "Scan_0_dark.xy").unwrap().clone();
    assert_eq!(loaded.scan_number(), 1);
    assert_eq!(loaded.counts(), dark.counts());
    assert_eq!(loaded.wavelengths(), dark.wavelengths());
    assert!(Arc::ptr_eq(loaded.wavelength_axis(), dark.wavelength_axis()));
    assert!(loaded.comments().starts_with("shutter; loaded from Scan_0_dark.xy (scan 0)"));
    assert_eq!(spec.store().slot_index(Slot::Dark), Some(1));

    assert!(matches!(
        spec.load_spectrum(SpectrumType::Sample, "Scan_0_dark.xy"),
        Err(SpectrometerError::UnsupportedSlotType(SpectrumType::Sample))
    ));
}

#[test]
fn test_failed_save_leaves_store_untouched() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"file").unwrap();

    let (mut spec, _controls) = connected(2);
    let request = AcquisitionRequest::sample()
        .scans(1)
        .save_as(Some(blocker.join("Scan.xy")));
    assert!(matches!(spec.measure(request), Err(SpectrometerError::IoError(_))));
    assert!(spec.store().is_empty());
}

#[test]
fn test_save_all_writes_files_and_manifest() {
    let dir = tempdir().unwrap();
    let config = SpectrometerConfig {
        experiment_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let mut spec = Microspectrometer::new(SimulatedDriver::with_pixels(3), config).unwrap();
    spec.connect().unwrap();
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::sample().scans(1)).unwrap();

    let stats = spec.save_all_spectra().unwrap();
    assert_eq!(stats.files_written, 3);
    assert_eq!(stats.points_written, 9);
    for name in ["Scan_0_dark.xy", "Scan_1_reference.xy", "Scan_2_sample.xy"] {
        assert!(dir.path().join(name).exists(), "missing {}", name);
    }

    let json = std::fs::read_to_string(&stats.manifest_path).unwrap();
    let manifest = Manifest::from_json(&json).unwrap();
    assert_eq!(manifest.session_id, spec.session_id());
    assert_eq!(manifest.slots.get("reference"), Some(&1));
    assert_eq!(manifest.device.as_deref(), Some("SIM2048 (SIM00001)"));
}

#[test]
fn test_flush_on_disconnect() {
    let dir = tempdir().unwrap();
    let config = SpectrometerConfig {
        experiment_dir: Some(dir.path().to_path_buf()),
        flush_on_disconnect: true,
        ..Default::default()
    };
    let mut spec = Microspectrometer::new(SimulatedDriver::with_pixels(2), config).unwrap();
    spec.connect().unwrap();
    spec.measure(AcquisitionRequest::sample().scans(1)).unwrap();
    spec.disconnect().unwrap();

    assert!(dir.path().join("Scan_0_sample.xy").exists());
    assert!(dir.path().join(crate::store::MANIFEST_FILE_NAME).exists());
}

#[test]
fn test_start_new_experiment_creates_directory() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("run").join("a");
    let (mut spec, _controls) = connected(2);
    assert_eq!(spec.start_new_experiment(Some(&target)).unwrap(), target.as_path());
    assert!(target.is_dir());
    assert_eq!(spec.experiment_dir(), target.as_path());
}

#[test]
fn test_monitor_stops_after_third_render() {
    let (mut spec, controls) = connected(2);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    let stored = spec.store().len();
    let reads_before = controls.reads();

    let stop = StopToken::new();
    let stopper = stop.clone();
    let mut scans = Vec::new();
    let summary = spec
        .continuous_transmission(Duration::ZERO, None, &stop, &mut |frame: &RenderFrame<'_>| {
            scans.push(frame.scan_number);
            if scans.len() == 3 {
                stopper.stop();
            }
        })
        .unwrap();

    assert_eq!(summary.renders, 3);
    assert_eq!(controls.reads() - reads_before, 3);
    assert_eq!(scans, vec![2, 3, 4]);
    assert_eq!(spec.store().len(), stored);
}

#[test]
fn test_monitor_requires_slots_before_acquiring() {
    let (mut spec, controls) = connected(2);
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    let reads = controls.reads();

    let result = spec.continuous_measurements(
        Duration::ZERO,
        None,
        &StopToken::new(),
        &mut |_: &RenderFrame<'_>| {},
    );
    assert!(matches!(result, Err(SpectrometerError::SlotNotSet(Slot::Dark))));
    assert_eq!(controls.reads(), reads);
}

#[test]
fn test_monitor_rejects_mismatched_dark_before_acquiring() {
    let dir = tempdir().unwrap();
    let (mut spec, controls) = connected(4);
    spec.start_new_experiment(Some(dir.path())).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    std::fs::write(dir.path().join("short_dark.xy"), "400 90\n410 91\n").unwrap();
    spec.load_spectrum(SpectrumType::Dark, "short_dark.xy").unwrap();
    let reads = controls.reads();

    let result = spec.continuous_measurements(
        Duration::ZERO,
        None,
        &StopToken::new(),
        &mut |_: &RenderFrame<'_>| {},
    );
    assert!(matches!(result, Err(SpectrometerError::IncompatibleSpectra(_))));
    assert_eq!(controls.reads(), reads);
    assert_eq!(spec.state(), ConnectionState::Connected);
}

#[test]
fn test_monitor_device_fault_propagates() {
    let (mut spec, controls) = connected(2);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::reference().scans(1)).unwrap();
    controls.inject_fault_after(1, DriverError::Io("usb reset".into()));

    let config = MonitorConfig::absorbance(Duration::ZERO).with_max_iterations(10);
    let result = spec.monitor(&config, &StopToken::new(), &mut |_: &RenderFrame<'_>| {});
    assert!(matches!(result, Err(SpectrometerError::DeviceIoError(_))));
    assert_eq!(spec.state(), ConnectionState::Error);
}

#[test]
fn test_describe_marks_slots() {
    let (mut spec, _controls) = connected(2);
    spec.measure(AcquisitionRequest::dark().scans(1)).unwrap();
    spec.measure(AcquisitionRequest::sample().scans(1).comments("cuvette 1"))
        .unwrap();
    let table = spec.describe_all_spectra().to_string();
    assert!(table.starts_with("Scan\tDateTime\tSpectrumType\tSlots\tComment"));
    assert!(table.contains("dark"));
    assert!(table.contains("cuvette 1"));
}
