//! # Acquisition Engine
//!
//! Host-side averaging: `number_of_scans` raw intensity arrays are read
//! sequentially at the current integration time and averaged elementwise.
//! A failure on any read fails the whole acquisition; no partial average is
//! ever returned.

use std::path::PathBuf;

use log::debug;

use crate::device::DeviceConnection;
use crate::error::SpectrometerError;
use crate::spectrum::SpectrumType;

/// Parameters of one `measure` call
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRequest {
    /// Role of the acquired spectrum (sample, reference or dark)
    pub spectrum_type: SpectrumType,
    /// Raw reads to average; `None` uses the session's configured count
    pub number_of_scans: Option<usize>,
    /// Persist the spectrum immediately
    pub save: bool,
    /// File name for `save`; defaults to `Scan_{n}_{type}.xy`
    pub filename: Option<PathBuf>,
    /// Free-text annotation
    pub comments: String,
    /// Append to the store history and update the matching slot
    pub store: bool,
}

impl Default for AcquisitionRequest {
    fn default() -> Self {
        Self {
            spectrum_type: SpectrumType::Sample,
            number_of_scans: None,
            save: false,
            filename: None,
            comments: String::new(),
            store: true,
        }
    }
}

impl AcquisitionRequest {
    /// Request for a given spectrum type with default settings
    pub fn new(spectrum_type: SpectrumType) -> Self {
        Self {
            spectrum_type,
            ..Default::default()
        }
    }

    /// Sample acquisition
    pub fn sample() -> Self {
        Self::new(SpectrumType::Sample)
    }

    /// Reference acquisition
    pub fn reference() -> Self {
        Self::new(SpectrumType::Reference)
    }

    /// Dark acquisition
    pub fn dark() -> Self {
        Self::new(SpectrumType::Dark)
    }

    /// Set the number of averaged scans
    pub fn scans(mut self, number_of_scans: usize) -> Self {
        self.number_of_scans = Some(number_of_scans);
        self
    }

    /// Save the spectrum, optionally under a specific file name
    pub fn save_as(mut self, filename: Option<PathBuf>) -> Self {
        self.save = true;
        self.filename = filename;
        self
    }

    /// Set the comments
    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    /// Enable or disable storing in the session history
    pub fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    /// Check the request before touching the device
    pub fn validate(&self) -> Result<(), SpectrometerError> {
        if self.number_of_scans == Some(0) {
            return Err(SpectrometerError::InvalidParameter(
                "number_of_scans must be at least 1".to_string(),
            ));
        }
        if !self.spectrum_type.is_raw() {
            return Err(SpectrometerError::InvalidParameter(format!(
                "cannot acquire a {} spectrum; scans must be sample, reference or dark",
                self.spectrum_type
            )));
        }
        Ok(())
    }
}

/// Read `number_of_scans` frames and return their elementwise mean.
///
/// Every frame must have `pixel_count` points; a short or long frame is a
/// device fault.
pub fn average_scans<C: DeviceConnection + ?Sized>(
    connection: &mut C,
    number_of_scans: usize,
    pixel_count: usize,
) -> Result<Vec<f64>, SpectrometerError> {
    if number_of_scans == 0 {
        return Err(SpectrometerError::InvalidParameter(
            "number_of_scans must be at least 1".to_string(),
        ));
    }

    let mut sum = vec![0.0f64; pixel_count];
    for scan in 0..number_of_scans {
        let frame = connection.acquire_intensities()?;
        if frame.len() != pixel_count {
            return Err(SpectrometerError::DeviceIoError(format!(
                "frame {} has {} pixels, expected {}",
                scan,
                frame.len(),
                pixel_count
            )));
        }
        for (acc, value) in sum.iter_mut().zip(&frame) {
            *acc += value;
        }
    }
    debug!("Averaged {} frames of {} pixels", number_of_scans, pixel_count);

    let n = number_of_scans as f64;
    for acc in &mut sum {
        *acc /= n;
    }
    Ok(sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::simulated::SimulatedDriver;
    use crate::device::{DriverError, SpectrometerDriver};

    fn open(driver: &mut SimulatedDriver) -> crate::device::simulated::SimulatedConnection {
        let handle = driver.list_devices().unwrap().remove(0);
        driver.open(&handle).unwrap()
    }

    #[test]
    fn test_average_of_scripted_frames() {
        let mut driver = SimulatedDriver::with_pixels(3);
        let controls = driver.controls();
        let mut conn = open(&mut driver);

        controls.push_frames(vec![
            vec![1.0, 10.0, 100.0],
            vec![3.0, 20.0, 200.0],
            vec![5.0, 30.0, 300.0],
            vec![7.0, 40.0, 400.0],
        ]);
        let mean = average_scans(&mut conn, 4, 3).unwrap();
        assert_eq!(mean, vec![4.0, 25.0, 250.0]);
        assert_eq!(controls.reads(), 4);
    }

    #[test]
    fn test_failure_mid_average_is_atomic() {
        let mut driver = SimulatedDriver::with_pixels(2);
        let controls = driver.controls();
        let mut conn = open(&mut driver);

        controls.inject_fault_after(1, DriverError::Timeout("no trigger".into()));
        let result = average_scans(&mut conn, 3, 2);
        assert!(matches!(result, Err(SpectrometerError::AcquisitionTimeout(_))));
        assert_eq!(controls.reads(), 1);

        // The fault was consumed; the next average succeeds
        assert!(average_scans(&mut conn, 3, 2).is_ok());
    }

    #[test]
    fn test_wrong_frame_length_is_device_error() {
        let mut driver = SimulatedDriver::with_pixels(2);
        let controls = driver.controls();
        let mut conn = open(&mut driver);

        controls.push_frames(vec![vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            average_scans(&mut conn, 1, 2),
            Err(SpectrometerError::DeviceIoError(_))
        ));
    }

    #[test]
    fn test_request_validation() {
        assert!(AcquisitionRequest::sample().validate().is_ok());
        assert!(AcquisitionRequest::dark().scans(0).validate().is_err());
        assert!(AcquisitionRequest::new(SpectrumType::Absorbance).validate().is_err());

        let request = AcquisitionRequest::reference()
            .scans(4)
            .comments("blank")
            .save_as(None);
        assert!(request.save);
        assert!(request.store);
        assert_eq!(request.number_of_scans, Some(4));
        assert_eq!(AcquisitionRequest::sample().number_of_scans, None);
    }
}
