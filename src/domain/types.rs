//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during estimation
//! - written to the JSON price catalog
//! - reloaded later for audits or comparisons

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Fixed route classification taxonomy from the feature store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteClass {
    PureBusiness,
    MixedBusinessLeisure,
    PureLeisure,
    EssentialRemote,
    LowCostTourist,
    HubToHub,
    SeasonalCharter,
}

impl RouteClass {
    pub const ALL: [RouteClass; 7] = [
        RouteClass::PureBusiness,
        RouteClass::MixedBusinessLeisure,
        RouteClass::PureLeisure,
        RouteClass::EssentialRemote,
        RouteClass::LowCostTourist,
        RouteClass::HubToHub,
        RouteClass::SeasonalCharter,
    ];

    /// Canonical label used by categorical modifier tables and exports.
    pub fn label(self) -> &'static str {
        match self {
            RouteClass::PureBusiness => "pure-business",
            RouteClass::MixedBusinessLeisure => "mixed-business-leisure",
            RouteClass::PureLeisure => "pure-leisure",
            RouteClass::EssentialRemote => "essential-remote",
            RouteClass::LowCostTourist => "low-cost-tourist",
            RouteClass::HubToHub => "hub-to-hub",
            RouteClass::SeasonalCharter => "seasonal-charter",
        }
    }

    /// Parse a feature-store value.
    ///
    /// Stores are inconsistent about casing and separators ("Pure Business",
    /// "pure_business", "pure-business"), so we normalize before matching.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '_' || c == '/' { '-' } else { c })
            .collect();
        Self::ALL.into_iter().find(|c| c.label() == normalized)
    }
}

/// One directed origin→destination route, as read from the feature store.
///
/// Records are immutable once ingested; the engine never writes back to them.
/// `actual_price` is the observed market price when the store has one; those
/// rows double as the regression training set.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub origin: String,
    pub destination: String,
    pub origin_population: u64,
    pub destination_population: u64,
    /// Scheduled flights per week.
    pub weekly_frequency: u32,
    /// Most common carrier; `"Unknown"` when the store has none.
    pub carrier: String,
    /// Most common aircraft model; `"Unknown"` when the store has none.
    pub aircraft: String,
    /// Seating capacity; 0 when unknown.
    pub capacity: u32,
    pub class: RouteClass,
    /// Decoded flight duration in minutes (see `io::ingest` for the
    /// hours-and-tenths wire format).
    pub duration_minutes: u32,
    pub actual_price: Option<f64>,
}

impl RouteRecord {
    /// Catalog key for upserts: `"ORG-DST"`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

/// Which estimator(s) a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Log-linear rule-based estimator only.
    RuleBased,
    /// Regression estimator only; too few labeled routes is a fatal error.
    Regression,
    /// Regression when it can be fitted, rule-based for the whole run otherwise.
    Both,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::RuleBased => "rule-based",
            Strategy::Regression => "regression",
            Strategy::Both => "both",
        })
    }
}

/// Which estimator actually produced a given estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSource {
    RuleBased,
    Regression,
}

impl PriceSource {
    pub fn display_name(self) -> &'static str {
        match self {
            PriceSource::RuleBased => "rule-based",
            PriceSource::Regression => "regression",
        }
    }
}

/// Per-modifier multipliers that went into a rule-based estimate.
///
/// Kept on the estimate for audit: when a backfilled price looks wrong, the
/// breakdown shows which table produced the distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierBreakdown {
    pub airline: f64,
    pub population: f64,
    pub season: f64,
    pub frequency: f64,
    pub short_notice: f64,
    pub capacity: f64,
    pub route_class: f64,
}

/// Output value object: one synthetic price per successfully processed route.
///
/// A price of 0.0 is the "do not trust this estimate" signal to the catalog
/// consumer (see `estimate::bounds`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub origin: String,
    pub destination: String,
    pub price: f64,
    pub source: PriceSource,
    pub effective_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ModifierBreakdown>,
}

impl PriceEstimate {
    pub fn key(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

/// Log-space combination weights for the rule-based estimator.
///
/// The airline weight dominates: carrier identity is by far the strongest
/// price signal in the calibration data. The remaining weights sit in
/// [0.1, 0.75]. All of them are configuration (CLI flags), not constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    pub airline: f64,
    pub population: f64,
    pub date: f64,
    pub frequency: f64,
    pub short_notice: f64,
    pub capacity: f64,
    pub route_class: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            airline: 9.0,
            population: 0.4,
            date: 0.3,
            frequency: 0.25,
            short_notice: 0.1,
            capacity: 0.35,
            route_class: 0.75,
        }
    }
}

impl Weights {
    fn validate(&self) -> Result<(), AppError> {
        let named = [
            ("airline", self.airline),
            ("population", self.population),
            ("date", self.date),
            ("frequency", self.frequency),
            ("short-notice", self.short_notice),
            ("capacity", self.capacity),
            ("route-class", self.route_class),
        ];
        for (name, w) in named {
            if !w.is_finite() || w < 0.0 {
                return Err(AppError::input(format!(
                    "Invalid {name} weight {w}: weights must be finite and >= 0."
                )));
            }
        }
        Ok(())
    }
}

/// One price-per-minute sanity bracket (see `estimate::bounds`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PpmBracket {
    /// Upper edge in effective minutes, inclusive; `None` marks the final
    /// open-ended bracket.
    pub max_minutes: Option<u32>,
    /// Lower plausible price-per-minute bound.
    pub min_ppm: f64,
    /// Upper plausible bound; absent for short brackets, which zero instead
    /// of clamping down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ppm: Option<f64>,
    /// Corrected estimates whose PPM still exceeds this ceiling are zeroed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_above_ppm: Option<f64>,
    /// Inclusive uniform jitter range applied when a price is rebuilt from a
    /// violated bound.
    pub jitter: (f64, f64),
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub store_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub strategy: Strategy,
    /// Date at which the seasonal modifier is evaluated.
    pub as_of: NaiveDate,

    pub base_price_per_minute: f64,
    pub calibration_divisor: f64,
    /// Duration (minutes) beyond which compression kicks in.
    pub duration_threshold: u32,
    /// Compression strength for the duration normalizer.
    pub log_k: f64,
    pub weights: Weights,
    /// Fixed multiplier standing in for booking lead time, which the feature
    /// store does not model.
    pub short_notice_multiplier: f64,
    pub rescale: f64,
    pub offset: f64,

    pub brackets: Vec<PpmBracket>,
    /// Run seed; each record derives its own jitter stream from it.
    pub seed: u64,
    /// When false, clamped prices use the exact bound (jitter sample 1.0).
    pub jitter_enabled: bool,
}

impl PricingConfig {
    /// Validate scalar settings before a run starts.
    ///
    /// Bracket-table validation lives with the boundary corrector
    /// (`estimate::bounds::validate_brackets`); the pipeline runs both.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.base_price_per_minute.is_finite() && self.base_price_per_minute > 0.0) {
            return Err(AppError::input(format!(
                "Invalid base price per minute {}: must be finite and > 0.",
                self.base_price_per_minute
            )));
        }
        if !(self.calibration_divisor.is_finite() && self.calibration_divisor > 0.0) {
            return Err(AppError::input(format!(
                "Invalid calibration divisor {}: must be finite and > 0.",
                self.calibration_divisor
            )));
        }
        if !(self.log_k.is_finite() && self.log_k > 0.0) {
            return Err(AppError::input(format!(
                "Invalid duration compression k={}: must be finite and > 0.",
                self.log_k
            )));
        }
        if !(self.short_notice_multiplier.is_finite() && self.short_notice_multiplier > 0.0) {
            return Err(AppError::input(format!(
                "Invalid short-notice multiplier {}: must be finite and > 0.",
                self.short_notice_multiplier
            )));
        }
        if !(self.rescale.is_finite() && self.rescale > 0.0) {
            return Err(AppError::input(format!(
                "Invalid rescale {}: must be finite and > 0.",
                self.rescale
            )));
        }
        if !self.offset.is_finite() {
            return Err(AppError::input(format!(
                "Invalid offset {}: must be finite.",
                self.offset
            )));
        }
        self.weights.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_class_parse_accepts_store_spellings() {
        assert_eq!(RouteClass::parse("Pure Business"), Some(RouteClass::PureBusiness));
        assert_eq!(
            RouteClass::parse("Mixed Business/Leisure"),
            Some(RouteClass::MixedBusinessLeisure)
        );
        assert_eq!(RouteClass::parse("hub_to_hub"), Some(RouteClass::HubToHub));
        assert_eq!(RouteClass::parse("seasonal-charter"), Some(RouteClass::SeasonalCharter));
        assert_eq!(RouteClass::parse("first-class-only"), None);
    }

    #[test]
    fn config_validation_rejects_bad_scalars() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.log_k = 0.0;
        assert!(config.validate().is_err());

        config = test_config();
        config.weights.airline = f64::NAN;
        assert!(config.validate().is_err());

        config = test_config();
        config.calibration_divisor = -1.0;
        assert!(config.validate().is_err());
    }

    fn test_config() -> PricingConfig {
        PricingConfig {
            store_dir: PathBuf::from("store"),
            catalog_path: PathBuf::from("catalog.json"),
            strategy: Strategy::RuleBased,
            as_of: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            base_price_per_minute: 1.15,
            calibration_divisor: 1.4,
            duration_threshold: 80,
            log_k: 50.0,
            weights: Weights::default(),
            short_notice_multiplier: 1.0,
            rescale: 0.85,
            offset: 12.0,
            brackets: Vec::new(),
            seed: 42,
            jitter_enabled: true,
        }
    }
}
