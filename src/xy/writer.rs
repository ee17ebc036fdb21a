use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;
use tempfile::NamedTempFile;

use super::{keys, XY_EXTENSION};
use crate::error::SpectrometerError;
use crate::spectrum::Spectrum;

/// Default file name for a spectrum: `Scan_{scan_number}_{spectrum_type}.xy`
pub fn default_file_name(spectrum: &Spectrum) -> String {
    format!(
        "Scan_{}_{}.{}",
        spectrum.scan_number(),
        spectrum.spectrum_type(),
        XY_EXTENSION
    )
}

/// Write the header and data rows of `spectrum`
pub fn write_spectrum<W: Write>(writer: &mut W, spectrum: &Spectrum) -> Result<(), SpectrometerError> {
    writeln!(writer, "# {}: {}", keys::SCAN_NUMBER, spectrum.scan_number())?;
    writeln!(
        writer,
        "# {}: {} microseconds",
        keys::INTEGRATION_TIME,
        spectrum.integration_time()
    )?;
    writeln!(
        writer,
        "# {}: {}",
        keys::TIMESTAMP,
        spectrum
            .timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    )?;
    writeln!(writer, "# {}: {}", keys::SPECTRUM_TYPE, spectrum.spectrum_type())?;
    writeln!(
        writer,
        "# {}: {}",
        keys::COMMENTS,
        escape_comment(spectrum.comments())
    )?;

    for (wavelength, value) in spectrum.wavelengths().iter().zip(spectrum.counts().iter()) {
        match value {
            Some(v) if v.is_finite() => writeln!(writer, "{}\t{}", wavelength, v)?,
            _ => writeln!(writer, "{}\tnan", wavelength)?,
        }
    }
    Ok(())
}

/// Save `spectrum` to `path`, replacing any existing file atomically
pub fn save_spectrum<P: AsRef<Path>>(path: P, spectrum: &Spectrum) -> Result<(), SpectrometerError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(temp.as_file());
        write_spectrum(&mut out, spectrum)?;
        out.flush()?;
    }
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn escape_comment(comment: &str) -> String {
    let mut escaped = String::with_capacity(comment.len());
    for c in comment.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub(super) fn unescape_comment(comment: &str) -> String {
    let mut out = String::with_capacity(comment.len());
    let mut chars = comment.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
