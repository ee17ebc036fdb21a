use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

use super::writer::unescape_comment;
use super::{keys, XyDocument, XyHeader};
use crate::error::SpectrometerError;
use crate::spectrum::{SpectralValues, SpectrumType};

/// Timestamp layout used by the legacy acquisition scripts
const LEGACY_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Read and parse an `.xy` file from disk
pub fn read_xy_file<P: AsRef<Path>>(path: P) -> Result<XyDocument, SpectrometerError> {
    let file = File::open(path)?;
    read_xy(BufReader::new(file))
}

/// Read and parse an `.xy` document from any reader
pub fn read_xy<R: Read>(mut reader: R) -> Result<XyDocument, SpectrometerError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_xy(&text)
}

/// Parse the text of an `.xy` document
pub fn parse_xy(text: &str) -> Result<XyDocument, SpectrometerError> {
    let mut header = XyHeader::default();
    let mut wavelengths: Vec<f64> = Vec::new();
    let mut values: Vec<Option<f64>> = Vec::new();

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        // Header values keep their trailing whitespace
        if let Some(meta) = raw_line.trim_start().strip_prefix('#') {
            parse_header_line(meta, line_no, &mut header)?;
            continue;
        }

        let columns: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .collect();
        if columns.len() != 2 {
            return Err(SpectrometerError::malformed(
                line_no,
                format!("expected 2 columns, found {}", columns.len()),
            ));
        }

        let wavelength = parse_float(columns[0], line_no)?;
        if !wavelength.is_finite() {
            return Err(SpectrometerError::malformed(line_no, "wavelength is not finite"));
        }
        if let Some(&previous) = wavelengths.last() {
            if wavelength <= previous {
                return Err(SpectrometerError::malformed(
                    line_no,
                    format!(
                        "wavelength {} does not increase (previous {})",
                        wavelength, previous
                    ),
                ));
            }
        }
        let value = parse_float(columns[1], line_no)?;

        wavelengths.push(wavelength);
        values.push(value.is_finite().then_some(value));
    }

    if wavelengths.is_empty() {
        return Err(SpectrometerError::malformed(0, "no data rows"));
    }

    Ok(XyDocument {
        header,
        wavelengths,
        values: SpectralValues::from_options(values),
    })
}

fn parse_float(token: &str, line_no: usize) -> Result<f64, SpectrometerError> {
    token
        .parse::<f64>()
        .map_err(|_| SpectrometerError::malformed(line_no, format!("'{}' is not a number", token)))
}

fn parse_header_line(
    meta: &str,
    line_no: usize,
    header: &mut XyHeader,
) -> Result<(), SpectrometerError> {
    // Lines without a recognized key are free-form comments
    let Some((key, value)) = meta.split_once(':') else {
        return Ok(());
    };
    let key = key.trim();
    let raw_value = value;
    let value = value.trim();

    if key.eq_ignore_ascii_case(keys::SCAN_NUMBER) {
        let scan_number = value.parse::<u64>().map_err(|_| {
            SpectrometerError::malformed(line_no, format!("invalid scan number '{}'", value))
        })?;
        header.scan_number = Some(scan_number);
    } else if key.eq_ignore_ascii_case(keys::INTEGRATION_TIME) {
        header.integration_time = Some(parse_integration_time(value, line_no)?);
    } else if key.eq_ignore_ascii_case(keys::TIMESTAMP) {
        header.timestamp = Some(parse_timestamp(value, line_no)?);
    } else if key.eq_ignore_ascii_case(keys::SPECTRUM_TYPE) {
        let spectrum_type = value.parse::<SpectrumType>().map_err(|_| {
            SpectrometerError::malformed(line_no, format!("unknown spectrum type '{}'", value))
        })?;
        header.spectrum_type = Some(spectrum_type);
    } else if key.eq_ignore_ascii_case(keys::COMMENTS) {
        // Only the separator space after ':' belongs to the format
        let comment = raw_value.strip_prefix(' ').unwrap_or(raw_value);
        header.comments = Some(unescape_comment(comment));
    }
    Ok(())
}

/// Accepts `100000 microseconds` and `100000.00 microseconds.`
fn parse_integration_time(value: &str, line_no: usize) -> Result<u32, SpectrometerError> {
    let number = value.split_whitespace().next().unwrap_or_default();
    let micros = number.parse::<f64>().map_err(|_| {
        SpectrometerError::malformed(line_no, format!("invalid integration time '{}'", value))
    })?;
    if !micros.is_finite() || micros < 1.0 || micros > u32::MAX as f64 {
        return Err(SpectrometerError::malformed(
            line_no,
            format!("integration time {} out of range", micros),
        ));
    }
    Ok(micros.round() as u32)
}

fn parse_timestamp(value: &str, line_no: usize) -> Result<DateTime<Utc>, SpectrometerError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            SpectrometerError::malformed(line_no, format!("unrecognized timestamp '{}'", value))
        })
}
