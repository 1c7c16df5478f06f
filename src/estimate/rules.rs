//! Rule-based log-linear price estimator.
//!
//! The price is a base fare scaled by seven multiplicative modifiers,
//! combined in log space:
//!
//! ```text
//! baseFare = basePricePerMinute * effectiveMinutes / calibrationDivisor
//! logPrice = ln(baseFare) + Σ weight_i * ln(modifier_i)
//! price    = exp(logPrice) * rescale + offset
//! ```
//!
//! Log space makes the combination a weighted *product* of modifiers while
//! keeping the arithmetic tame, and it gives weights a clean meaning: a zero
//! weight removes a modifier's influence entirely (`0 * ln(m) = 0`).
//!
//! Missing table entries never reach this function: lookups already
//! defaulted them to 1.0. A modifier that is present but <= 0 here means the
//! load-time validation was bypassed, and we fail loudly instead of pricing
//! off garbage.

use chrono::Datelike;

use crate::domain::{ModifierBreakdown, PricingConfig, RouteRecord};
use crate::error::AppError;
use crate::tables::ModifierSet;

/// Estimate a price for one route from its effective duration and the
/// modifier tables. Returns the per-modifier breakdown for audit.
pub fn estimate(
    route: &RouteRecord,
    effective_minutes: u32,
    tables: &ModifierSet,
    config: &PricingConfig,
) -> Result<(f64, ModifierBreakdown), AppError> {
    if effective_minutes == 0 {
        return Err(AppError::internal(format!(
            "Zero effective duration for route {}; ingest should have rejected it.",
            route.key()
        )));
    }

    let base_fare =
        config.base_price_per_minute * f64::from(effective_minutes) / config.calibration_divisor;
    if !(base_fare.is_finite() && base_fare > 0.0) {
        return Err(AppError::internal(format!(
            "Non-positive base fare {base_fare} for route {}.",
            route.key()
        )));
    }

    let breakdown = lookup_modifiers(route, tables, config);

    let w = &config.weights;
    let terms = [
        ("airline", breakdown.airline, w.airline),
        ("population", breakdown.population, w.population),
        ("season", breakdown.season, w.date),
        ("frequency", breakdown.frequency, w.frequency),
        ("short-notice", breakdown.short_notice, w.short_notice),
        ("capacity", breakdown.capacity, w.capacity),
        ("route-class", breakdown.route_class, w.route_class),
    ];

    let mut log_price = base_fare.ln();
    for (name, modifier, weight) in terms {
        if !(modifier.is_finite() && modifier > 0.0) {
            return Err(AppError::internal(format!(
                "Non-positive {name} modifier {modifier} for route {}; modifier tables must be validated at load.",
                route.key()
            )));
        }
        log_price += weight * modifier.ln();
    }

    let price = log_price.exp() * config.rescale + config.offset;
    if !price.is_finite() {
        return Err(AppError::internal(format!(
            "Non-finite rule-based price for route {}.",
            route.key()
        )));
    }

    Ok((price, breakdown))
}

/// Resolve the seven modifiers for one route.
///
/// The population modifier averages the two endpoint bands; the seasonal
/// modifier is keyed by the run's as-of day-of-year.
fn lookup_modifiers(
    route: &RouteRecord,
    tables: &ModifierSet,
    config: &PricingConfig,
) -> ModifierBreakdown {
    let population = 0.5
        * (tables.population.lookup(route.origin_population)
            + tables.population.lookup(route.destination_population));

    ModifierBreakdown {
        airline: tables.airline.lookup(&route.carrier),
        population,
        season: tables.season.lookup(u64::from(config.as_of.ordinal())),
        frequency: tables.frequency.lookup(u64::from(route.weekly_frequency)),
        short_notice: config.short_notice_multiplier,
        capacity: tables.capacity.lookup(u64::from(route.capacity)),
        route_class: tables.route_class.lookup(route.class.label()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{RouteClass, Strategy, Weights};
    use crate::estimate::duration::effective_minutes;
    use crate::tables::{CategoricalTable, RangeRow, RangeTable};

    fn test_route() -> RouteRecord {
        RouteRecord {
            origin: "TRD".to_string(),
            destination: "BGO".to_string(),
            origin_population: 200_000,
            destination_population: 280_000,
            weekly_frequency: 21,
            carrier: "Unknown".to_string(),
            aircraft: "B738".to_string(),
            capacity: 189,
            class: RouteClass::LowCostTourist,
            duration_minutes: 100,
            actual_price: None,
        }
    }

    fn test_config() -> PricingConfig {
        PricingConfig {
            store_dir: PathBuf::from("store"),
            catalog_path: PathBuf::from("catalog.json"),
            strategy: Strategy::RuleBased,
            as_of: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            base_price_per_minute: 1.15,
            calibration_divisor: 1.4,
            duration_threshold: 100,
            log_k: 50.0,
            weights: Weights::default(),
            short_notice_multiplier: 1.0,
            rescale: 0.85,
            offset: 12.0,
            brackets: Vec::new(),
            seed: 42,
            jitter_enabled: false,
        }
    }

    #[test]
    fn all_default_modifiers_reduce_to_rescaled_base_fare() {
        // Golden reference free of modifier interaction: empty tables default
        // every lookup to 1.0, so all log terms vanish and the price is the
        // calibrated rescale of the base fare alone.
        let route = test_route();
        let config = test_config();
        let tables = ModifierSet::default();

        let eff = effective_minutes(route.duration_minutes, config.duration_threshold, config.log_k);
        assert_eq!(eff, 100);

        let (price, breakdown) = estimate(&route, eff, &tables, &config).unwrap();

        let base_fare = config.base_price_per_minute * 100.0 / config.calibration_divisor;
        let expected = base_fare * config.rescale + config.offset;
        assert!(
            (price - expected).abs() < 1e-9,
            "expected {expected}, got {price}"
        );
        assert_eq!(breakdown.airline, 1.0);
        assert_eq!(breakdown.population, 1.0);
    }

    #[test]
    fn zero_weight_removes_a_modifier_entirely() {
        let route = test_route();
        let mut config = test_config();
        config.weights.capacity = 0.0;

        let eff = 100;
        let capacity_band = |multiplier: f64| {
            let mut tables = ModifierSet::default();
            tables.capacity = RangeTable::new(vec![RangeRow {
                min: 0,
                max: None,
                multiplier,
            }])
            .unwrap();
            tables
        };

        let (p_low, _) = estimate(&route, eff, &capacity_band(0.5), &config).unwrap();
        let (p_high, _) = estimate(&route, eff, &capacity_band(2.0), &config).unwrap();
        assert!(
            (p_low - p_high).abs() < 1e-12,
            "zero-weight capacity still moved the price: {p_low} vs {p_high}"
        );
    }

    #[test]
    fn airline_weight_dominates() {
        let mut route = test_route();
        route.carrier = "BudgetJet".to_string();
        let config = test_config();

        let mut entries = HashMap::new();
        entries.insert("BudgetJet".to_string(), 0.9);
        let mut tables = ModifierSet::default();
        tables.airline = CategoricalTable::new(entries).unwrap();

        let (discounted, _) = estimate(&route, 100, &tables, &config).unwrap();
        let (neutral, _) = estimate(&route, 100, &ModifierSet::default(), &config).unwrap();

        // 0.9^9 ≈ 0.39: a mild carrier discount moves the price a lot.
        let ratio = (discounted - config.offset) / (neutral - config.offset);
        assert!(
            (ratio - 0.9_f64.powi(9)).abs() < 1e-9,
            "airline modifier should enter with weight 9, ratio {ratio}"
        );
    }

    #[test]
    fn population_modifier_averages_both_endpoints() {
        let route = test_route();
        let config = test_config();

        let mut tables = ModifierSet::default();
        tables.population = RangeTable::new(vec![
            RangeRow { min: 0, max: Some(249_999), multiplier: 0.8 },
            RangeRow { min: 250_000, max: None, multiplier: 1.2 },
        ])
        .unwrap();

        let (_, breakdown) = estimate(&route, 100, &tables, &config).unwrap();
        // origin 200k -> 0.8, destination 280k -> 1.2, mean 1.0.
        assert!((breakdown.population - 1.0).abs() < 1e-12);
    }

    #[test]
    fn seasonal_modifier_follows_the_as_of_date() {
        let route = test_route();
        let mut config = test_config();

        let mut tables = ModifierSet::default();
        // High season: June through August (roughly days 152-243).
        tables.season = RangeTable::new(vec![RangeRow {
            min: 152,
            max: Some(243),
            multiplier: 1.3,
        }])
        .unwrap();

        config.as_of = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        let (_, summer) = estimate(&route, 100, &tables, &config).unwrap();
        assert_eq!(summer.season, 1.3);

        config.as_of = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (_, winter) = estimate(&route, 100, &tables, &config).unwrap();
        assert_eq!(winter.season, 1.0);
    }

    #[test]
    fn zero_effective_duration_is_rejected() {
        let route = test_route();
        let config = test_config();
        assert!(estimate(&route, 0, &ModifierSet::default(), &config).is_err());
    }
}
