//! Command-line parsing for the synthetic price estimation engine.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! estimation/math code; `app` owns dispatch.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::domain::Strategy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fares", version, about = "Synthetic route price estimation engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate a price for every route in the feature store and upsert the
    /// results into the price catalog.
    EstimatePrices(EstimateArgs),
}

/// Options for a batch estimation run.
#[derive(Debug, Parser, Clone)]
pub struct EstimateArgs {
    /// Feature-store directory containing `routes.csv` and `modifiers.json`.
    #[arg(long, value_name = "DIR")]
    pub store: PathBuf,

    /// Price catalog JSON to create or update (upsert by route key).
    #[arg(long, value_name = "JSON")]
    pub out: PathBuf,

    /// Estimation strategy.
    #[arg(long, value_enum, default_value_t = Strategy::RuleBased)]
    pub strategy: Strategy,

    /// As-of date for the seasonal modifier (defaults to today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub as_of: Option<NaiveDate>,

    /// Base price per effective minute, before modifiers.
    #[arg(long, default_value_t = 1.15)]
    pub base_price_per_minute: f64,

    /// Calibration divisor applied to the base fare.
    #[arg(long, default_value_t = 1.4)]
    pub calibration_divisor: f64,

    /// Duration (minutes) beyond which logarithmic compression kicks in.
    #[arg(long, default_value_t = 80)]
    pub duration_threshold: u32,

    /// Compression strength `k` for the duration normalizer.
    #[arg(long, default_value_t = 50.0)]
    pub log_k: f64,

    /// Rescale factor applied to the combined price.
    #[arg(long, default_value_t = 0.85)]
    pub rescale: f64,

    /// Offset added to the rescaled price.
    #[arg(long, default_value_t = 12.0)]
    pub offset: f64,

    /// Short-notice multiplier (fixed while booking lead time is not modeled).
    #[arg(long, default_value_t = 1.0)]
    pub short_notice: f64,

    /// Log-space weight of the airline modifier.
    #[arg(long, default_value_t = 9.0)]
    pub weight_airline: f64,

    /// Log-space weight of the endpoint-population modifier.
    #[arg(long, default_value_t = 0.4)]
    pub weight_population: f64,

    /// Log-space weight of the seasonal (calendar date) modifier.
    #[arg(long, default_value_t = 0.3)]
    pub weight_date: f64,

    /// Log-space weight of the weekly-frequency modifier.
    #[arg(long, default_value_t = 0.25)]
    pub weight_frequency: f64,

    /// Log-space weight of the short-notice modifier.
    #[arg(long, default_value_t = 0.1)]
    pub weight_short_notice: f64,

    /// Log-space weight of the seating-capacity modifier.
    #[arg(long, default_value_t = 0.35)]
    pub weight_capacity: f64,

    /// Log-space weight of the route-classification modifier.
    #[arg(long, default_value_t = 0.75)]
    pub weight_route_class: f64,

    /// Run seed for boundary-correction jitter.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Disable jitter: clamped prices use the exact bound (reproducible runs).
    #[arg(long)]
    pub no_jitter: bool,

    /// Override the built-in PPM bracket table with a JSON file.
    #[arg(long, value_name = "JSON")]
    pub brackets: Option<PathBuf>,
}
