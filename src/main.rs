//! cytobin - binned channel summaries for dual-colour flow cytometry.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, unreadable input, or failed output

mod cli;
mod config;
mod data;
mod pipeline;
mod report;

use std::path::Path;

use anyhow::{Context, Result, bail};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};

fn main() {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    init_logging(&args);

    let outcome = if args.init_config {
        handle_init_config()
    } else {
        run(&args)
    };

    if let Err(e) = outcome {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over `-v` / `-q`.
fn init_logging(args: &Args) {
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .format_target(false)
        .parse_default_env()
        .init();
}

/// Handle --init-config: generate a default cytobin.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        bail!("{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
    }

    let content = Config::default_toml()?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;
    log::info!("Created {DEFAULT_CONFIG_FILE} with default settings");
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    if config.samples.is_empty() {
        bail!("No samples given. Pass sample files as arguments or list them under [[samples]] in {DEFAULT_CONFIG_FILE}");
    }

    let settings = config.pipeline_settings()?;
    log::debug!("Settings: {settings:?}");

    let result = pipeline::run(&config.samples, &settings)?;
    let content = report::render(&result, config.output.format)?;
    report::write_output(&content, config.output.path.as_deref())?;

    log::info!(
        "Wrote {} bins for {} samples{}",
        result.len(),
        result.sample_labels().len(),
        config
            .output
            .path
            .as_ref()
            .map(|p| format!(" to {}", p.display()))
            .unwrap_or_default()
    );
    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        log::info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default()? {
        Some(config) => {
            log::info!("Loaded config from {DEFAULT_CONFIG_FILE}");
            Ok(config)
        }
        None => {
            log::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
