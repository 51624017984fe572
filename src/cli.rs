//! Command-line interface argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::data::binning::BinWidth;
use crate::data::transform::Transform;
use crate::pipeline::SampleSource;
use crate::report::OutputFormat;

/// cytobin - binned channel summaries for dual-colour flow cytometry
///
/// Bins the primary channel of each sample and reports count, mean and
/// standard error of the secondary channel per bin, for all samples in
/// one combined table.
///
/// Examples:
///   cytobin control=ctrl.csv treated=trt.csv
///   cytobin --primary GFP-A --secondary RFP-A --bin-width 0.05 run.parquet
///   cytobin --config cytobin.toml --format json -o binned.json
///   cytobin --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sample files, each as PATH or LABEL=PATH
    ///
    /// Replaces the [[samples]] list of the config file when given.
    #[arg(value_name = "SAMPLE")]
    pub samples: Vec<SampleSource>,

    /// Column holding the primary (binned) channel
    #[arg(long, value_name = "COLUMN", env = "CYTOBIN_PRIMARY")]
    pub primary: Option<String>,

    /// Column holding the secondary (summarised) channel
    #[arg(long, value_name = "COLUMN", env = "CYTOBIN_SECONDARY")]
    pub secondary: Option<String>,

    /// Bin width on the transformed primary channel
    #[arg(short = 'w', long, value_name = "WIDTH")]
    pub bin_width: Option<BinWidth>,

    /// Transform applied to both channels: none, log10, ln, asinh[:COFACTOR]
    #[arg(short, long, value_name = "TRANSFORM")]
    pub transform: Option<Transform>,

    /// Keep rows with zero or negative readings
    #[arg(long)]
    pub keep_non_positive: bool,

    /// Output format
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for cytobin.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a default cytobin.toml and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        if self.primary.is_some() && self.primary == self.secondary {
            return Err("--primary and --secondary must name different columns".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            log::LevelFilter::Error
        } else if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
