use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use microspec::calibration::CalibrationMode;
use microspec::config::SpectrometerConfig;

mod calibrate;
mod demo;
mod info;

mod config;

pub use config::Config;

/// microspec - UV-Vis microspectrometer acquisition and calibration
#[derive(Parser)]
#[command(name = "microspec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Session preset trading speed against noise.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum PresetArg {
    /// Short exposures, no averaging
    Fast,
    /// Session defaults (100 ms, 10 scans)
    #[default]
    Standard,
    /// Long exposures, heavy averaging
    LowNoise,
}

impl From<PresetArg> for SpectrometerConfig {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Fast => SpectrometerConfig::fast_preview(),
            PresetArg::Standard => SpectrometerConfig::default(),
            PresetArg::LowNoise => SpectrometerConfig::low_noise(),
        }
    }
}

/// Calibrated quantity.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ModeArg {
    /// -log10 of the dark-corrected ratio
    #[default]
    Absorbance,
    /// Dark-corrected ratio in percent
    Transmission,
}

impl From<ModeArg> for CalibrationMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Absorbance => CalibrationMode::Absorbance,
            ModeArg::Transmission => CalibrationMode::Transmission,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated session: dark, reference, sample, live monitoring, save-all
    Demo {
        /// Experiment directory for the written files
        #[arg(value_name = "OUTPUT_DIR", default_value = "microspec_demo")]
        output: PathBuf,

        /// Monitoring iterations
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Session preset
        #[arg(short = 'p', long, default_value = "standard", value_enum)]
        preset: PresetArg,

        /// Quantity shown while monitoring
        #[arg(short = 'm', long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// Display information about a .xy spectrum file
    Info {
        /// Input .xy file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Calibrate a sample file against reference and dark files
    Calibrate {
        /// Sample .xy file
        #[arg(long, value_name = "FILE")]
        sample: PathBuf,

        /// Reference .xy file
        #[arg(long, value_name = "FILE")]
        reference: PathBuf,

        /// Dark .xy file
        #[arg(long, value_name = "FILE")]
        dark: PathBuf,

        /// Quantity to compute
        #[arg(short = 'm', long, default_value = "absorbance", value_enum)]
        mode: ModeArg,

        /// Output file (defaults to <sample>_<mode>.xy next to the sample)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Demo {
            output,
            iterations,
            preset,
            mode,
        } => demo::run(
            output,
            iterations,
            preset.into(),
            mode.map(CalibrationMode::from),
            &file_config,
        ),
        Commands::Info { file } => info::run(file),
        Commands::Calibrate {
            sample,
            reference,
            dark,
            mode,
            output,
        } => calibrate::run(sample, reference, dark, mode.into(), output),
    }
}
