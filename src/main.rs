//! # microspec
//!
//! Command-line front end for the `microspec` library.
//!
//! ## Usage
//!
//! ```bash
//! # Simulated session written to ./run1
//! microspec -v demo run1 --iterations 10
//!
//! # Inspect a spectrum file
//! microspec info run1/Scan_2_sample.xy
//!
//! # Offline calibration of saved files
//! microspec calibrate --sample s.xy --reference r.xy --dark d.xy --mode transmission
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
