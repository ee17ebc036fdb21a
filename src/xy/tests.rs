use super::*;
use crate::spectrum::SpectrumBuilder;
use proptest::prelude::*;
use tempfile::tempdir;

fn reference_spectrum() -> Spectrum {
    SpectrumBuilder::new(7, SpectrumType::Reference)
        .integration_time(250_000)
        .wavelengths(vec![400.0, 400.5, 401.125])
        .counts(vec![1000.0, 1234.5678, 0.1])
        .comments("blank cuvette\nsecond line \\ with backslash")
        .build()
        .unwrap()
}

#[test]
fn test_round_trip_through_file() -> Result<(), SpectrometerError> {
    let dir = tempdir()?;
    let spectrum = reference_spectrum();
    let path = dir.path().join(default_file_name(&spectrum));

    save_spectrum(&path, &spectrum)?;
    let loaded = read_xy_file(&path)?.into_spectrum()?;

    assert_eq!(loaded.wavelengths(), spectrum.wavelengths());
    assert_eq!(loaded.counts(), spectrum.counts());
    assert_eq!(loaded.scan_number(), 7);
    assert_eq!(loaded.integration_time(), 250_000);
    assert_eq!(loaded.spectrum_type(), SpectrumType::Reference);
    assert_eq!(loaded.comments(), spectrum.comments());
    assert_eq!(
        loaded.timestamp().timestamp_micros(),
        spectrum.timestamp().timestamp_micros()
    );
    Ok(())
}

#[test]
fn test_padded_comments_survive_round_trip() -> Result<(), SpectrometerError> {
    let spectrum = SpectrumBuilder::new(3, SpectrumType::Sample)
        .integration_time(1_000)
        .wavelengths(vec![400.0, 410.0])
        .counts(vec![5.0, 6.0])
        .comments("  indented note  ")
        .build()?;

    let mut buffer = Vec::new();
    write_spectrum(&mut buffer, &spectrum)?;
    let loaded = read_xy(buffer.as_slice())?.into_spectrum()?;

    assert_eq!(loaded.comments(), "  indented note  ");
    Ok(())
}

#[test]
fn test_comment_separator_space_is_not_content() -> Result<(), SpectrometerError> {
    let doc = parse_xy("#Comments:tight\n400 1\n")?;
    assert_eq!(doc.header.comments.as_deref(), Some("tight"));

    let doc = parse_xy("# Comments: blank cuvette\n400 1\n")?;
    assert_eq!(doc.header.comments.as_deref(), Some("blank cuvette"));
    Ok(())
}

#[test]
fn test_default_file_name() {
    assert_eq!(default_file_name(&reference_spectrum()), "Scan_7_reference.xy");
}

#[test]
fn test_undefined_values_written_as_nan() -> Result<(), SpectrometerError> {
    let spectrum = SpectrumBuilder::new(1, SpectrumType::Absorbance)
        .integration_time(10)
        .wavelengths(vec![400.0, 500.0])
        .values(SpectralValues::from_options(vec![Some(0.3), None]))
        .build()?;

    let mut buffer = Vec::new();
    write_spectrum(&mut buffer, &spectrum)?;
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains("500\tnan"));

    let doc = parse_xy(&text)?;
    assert!(doc.values.is_undefined(1));
    assert_eq!(doc.values.get(0), Some(0.3));
    Ok(())
}

#[test]
fn test_legacy_numpy_file() -> Result<(), SpectrometerError> {
    let text = "\
# Scan Number: 4
# Integration Time: 100000.00 microseconds.
# Spectrum Type: current_spectrum
# Comments: run A
3.500000000000000000e+02 1.200000000000000000e+03
3.510000000000000000e+02 1.250000000000000000e+03
";
    let doc = parse_xy(text)?;
    assert_eq!(doc.header.scan_number, Some(4));
    assert_eq!(doc.header.integration_time, Some(100_000));
    assert_eq!(doc.header.spectrum_type, Some(SpectrumType::Sample));
    assert!(doc.header.timestamp.is_none());
    assert_eq!(doc.wavelengths, vec![350.0, 351.0]);
    assert_eq!(doc.values.get(1), Some(1250.0));
    Ok(())
}

#[test]
fn test_free_form_header_lines_ignored() -> Result<(), SpectrometerError> {
    let doc = parse_xy("# just a note\n#\n400 1\n500 2\n")?;
    assert_eq!(doc.header, XyHeader::default());
    assert_eq!(doc.len(), 2);
    Ok(())
}

#[test]
fn test_headerless_file_uses_fallbacks() -> Result<(), SpectrometerError> {
    let doc = parse_xy("400 10\n500 20\n")?;
    let spectrum = doc.into_spectrum_with(9, 50_000, SpectrumType::Dark)?;
    assert_eq!(spectrum.scan_number(), 9);
    assert_eq!(spectrum.integration_time(), 50_000);
    assert_eq!(spectrum.spectrum_type(), SpectrumType::Dark);
    Ok(())
}

#[test]
fn test_wrong_column_count() {
    let err = parse_xy("400 1\n500 2 3\n").unwrap_err();
    assert!(matches!(err, SpectrometerError::MalformedFile { line: 2, .. }));
}

#[test]
fn test_non_monotonic_wavelengths() {
    let err = parse_xy("# Scan Number: 1\n500 1\n400 2\n").unwrap_err();
    assert!(matches!(err, SpectrometerError::MalformedFile { line: 3, .. }));
}

#[test]
fn test_bad_number_and_empty_file() {
    assert!(matches!(
        parse_xy("400 abc\n"),
        Err(SpectrometerError::MalformedFile { line: 1, .. })
    ));
    assert!(matches!(
        parse_xy("# Scan Number: 1\n"),
        Err(SpectrometerError::MalformedFile { line: 0, .. })
    ));
    assert!(matches!(
        parse_xy("# Spectrum Type: fluorescence\n400 1\n"),
        Err(SpectrometerError::MalformedFile { line: 1, .. })
    ));
}

#[test]
fn test_legacy_timestamp_accepted() -> Result<(), SpectrometerError> {
    let doc = parse_xy("# Timestamp: 10/19/2026 09:41:07\n400 1\n")?;
    assert!(doc.header.timestamp.is_some());
    Ok(())
}

proptest! {
    /// Any strictly increasing axis with finite counts survives a write/parse cycle exactly
    #[test]
    fn test_xy_roundtrip_exact(
        start in 150.0f64..400.0,
        steps in prop::collection::vec(0.001f64..5.0, 1..64),
        counts_seed in prop::collection::vec(-1.0e6f64..1.0e6, 65),
    ) {
        let mut wavelengths = vec![start];
        for step in &steps {
            let next = wavelengths[wavelengths.len() - 1] + step;
            wavelengths.push(next);
        }
        let counts: Vec<f64> = counts_seed.iter().take(wavelengths.len()).copied().collect();
        prop_assume!(counts.len() == wavelengths.len());

        let spectrum = SpectrumBuilder::new(3, SpectrumType::Sample)
            .integration_time(1000)
            .wavelengths(wavelengths)
            .counts(counts)
            .build()
            .unwrap();

        let mut buffer = Vec::new();
        write_spectrum(&mut buffer, &spectrum).unwrap();
        let loaded = read_xy(&buffer[..]).unwrap().into_spectrum().unwrap();

        prop_assert_eq!(loaded.wavelengths(), spectrum.wavelengths());
        prop_assert_eq!(loaded.counts(), spectrum.counts());
    }
}
