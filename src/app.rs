//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - assembles the run configuration
//! - opens the price catalog
//! - runs the estimation pipeline
//! - prints the run summary

use std::fs::File;
use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{Command, EstimateArgs};
use crate::domain::{PpmBracket, PricingConfig, Weights};
use crate::error::AppError;
use crate::estimate::bounds;
use crate::io::catalog::JsonCatalog;

pub mod pipeline;

/// Entry point for the `fares` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::EstimatePrices(args) => handle_estimate(args),
    }
}

fn handle_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let config = pricing_config_from_args(&args)?;

    let mut catalog = JsonCatalog::open(&config.catalog_path)?;
    let cancel = AtomicBool::new(false);
    let out = pipeline::run_estimate(&config, &mut catalog, &cancel)?;

    println!("{}", crate::report::format_run_summary(&out, &config));

    // A run that produced nothing is a failure even when no single step was
    // fatal on its own.
    if out.summary.estimated == 0 {
        return Err(AppError::data(
            "No records were successfully estimated; see the summary above.",
        ));
    }
    Ok(())
}

pub fn pricing_config_from_args(args: &EstimateArgs) -> Result<PricingConfig, AppError> {
    let brackets = match &args.brackets {
        Some(path) => {
            let file = File::open(path).map_err(|e| {
                AppError::input(format!(
                    "Failed to open brackets JSON '{}': {e}",
                    path.display()
                ))
            })?;
            let brackets: Vec<PpmBracket> = serde_json::from_reader(file).map_err(|e| {
                AppError::input(format!("Invalid brackets JSON '{}': {e}", path.display()))
            })?;
            brackets
        }
        None => bounds::default_brackets(),
    };

    let config = PricingConfig {
        store_dir: args.store.clone(),
        catalog_path: args.out.clone(),
        strategy: args.strategy,
        as_of: args.as_of.unwrap_or_else(today),
        base_price_per_minute: args.base_price_per_minute,
        calibration_divisor: args.calibration_divisor,
        duration_threshold: args.duration_threshold,
        log_k: args.log_k,
        weights: Weights {
            airline: args.weight_airline,
            population: args.weight_population,
            date: args.weight_date,
            frequency: args.weight_frequency,
            short_notice: args.weight_short_notice,
            capacity: args.weight_capacity,
            route_class: args.weight_route_class,
        },
        short_notice_multiplier: args.short_notice,
        rescale: args.rescale,
        offset: args.offset,
        brackets,
        seed: args.seed,
        jitter_enabled: !args.no_jitter,
    };

    config.validate()?;
    bounds::validate_brackets(&config.brackets)?;
    Ok(config)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
