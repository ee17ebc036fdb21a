use anyhow::{Context, Result};
use std::path::PathBuf;

#[cfg(feature = "colorized_output")]
use console::style;

use microspec::xy::{read_xy_file, XyDocument};

/// Display information about a .xy spectrum file
pub fn run(file: PathBuf) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let doc = read_xy_file(&file)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    heading("Spectrum File Information");
    println!("File: {}", file.display());
    println!();

    heading("Header");
    print_header(&doc);
    println!();

    heading("Data");
    println!("  Points: {}", doc.len());
    if let (Some(first), Some(last)) = (doc.wavelengths.first(), doc.wavelengths.last()) {
        println!("  Wavelength range: {:.3} - {:.3} nm", first, last);
        if doc.len() > 1 {
            println!(
                "  Mean spacing: {:.4} nm",
                (last - first) / (doc.len() - 1) as f64
            );
        }
    }
    match doc.values.range() {
        Some((min, max)) => println!("  Value range: {} - {}", min, max),
        None => println!("  Value range: <all undefined>"),
    }
    println!("  Undefined points: {}", doc.values.undefined_count());

    Ok(())
}

fn print_header(doc: &XyDocument) {
    let header = &doc.header;
    let missing = || "<not recorded>".to_string();

    println!(
        "  Scan number: {}",
        header.scan_number.map(|n| n.to_string()).unwrap_or_else(missing)
    );
    println!(
        "  Spectrum type: {}",
        header.spectrum_type.map(|t| t.to_string()).unwrap_or_else(missing)
    );
    println!(
        "  Integration time: {}",
        header
            .integration_time
            .map(|us| format!("{} us ({:.1} ms)", us, us as f64 / 1000.0))
            .unwrap_or_else(missing)
    );
    println!(
        "  Timestamp: {}",
        header
            .timestamp
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(missing)
    );
    if let Some(comments) = header.comments.as_deref().filter(|c| !c.is_empty()) {
        println!("  Comments: {}", comments.replace('\n', " / "));
    }
}

fn heading(title: &str) {
    #[cfg(feature = "colorized_output")]
    {
        println!("{}", style(title).bold().cyan());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", title);
        println!("{}", "=".repeat(title.len()));
    }
}
