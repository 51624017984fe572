//! Configuration file handling.
//!
//! Settings come from `cytobin.toml` (or `--config PATH`) and are then
//! overridden by whatever the command line sets explicitly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::data::binning::BinWidth;
use crate::data::filter::CleaningRules;
use crate::data::loader::ChannelSelection;
use crate::data::transform::Transform;
use crate::pipeline::{PipelineSettings, SampleSource};
use crate::report::OutputFormat;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "cytobin.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channels: ChannelSelection,

    #[serde(default)]
    pub binning: BinningConfig,

    #[serde(default)]
    pub cleaning: CleaningRules,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Samples to process, in output order.
    #[serde(default)]
    pub samples: Vec<SampleSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    /// Bin width on the (transformed) primary channel.
    #[serde(default = "default_width")]
    pub width: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
        }
    }
}

fn default_width() -> f64 {
    0.1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// `none`, `log10`, `ln`, `asinh` or `asinh:<cofactor>`.
    #[serde(default)]
    pub kind: Transform,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Output file; stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// Relative sample paths are resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(base) = path.parent() {
            for sample in &mut config.samples {
                if sample.path.is_relative() {
                    sample.path = base.join(&sample.path);
                }
            }
        }

        Ok(config)
    }

    /// Try to load configuration from the working directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values the command line sets explicitly override the file.
    /// Samples given on the command line replace the configured list.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref primary) = args.primary {
            self.channels.primary = primary.clone();
        }
        if let Some(ref secondary) = args.secondary {
            self.channels.secondary = secondary.clone();
        }
        if let Some(width) = args.bin_width {
            self.binning.width = width.get();
        }
        if let Some(transform) = args.transform {
            self.transform.kind = transform;
        }
        if args.keep_non_positive {
            self.cleaning.drop_non_positive = false;
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }
        if let Some(ref output) = args.output {
            self.output.path = Some(output.clone());
        }
        if !args.samples.is_empty() {
            self.samples = args.samples.clone();
        }
    }

    /// Validated settings for the processing pipeline.
    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let bin_width = BinWidth::new(self.binning.width).context("invalid [binning] width")?;
        Ok(PipelineSettings {
            channels: self.channels.clone(),
            cleaning: self.cleaning,
            transform: self.transform.kind,
            bin_width,
        })
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        let config = Config::default();
        toml::to_string_pretty(&config).context("Failed to serialize default configuration")
    }
}
