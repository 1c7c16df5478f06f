//! Modifier lookup tables.
//!
//! Two shapes cover every modifier the rule-based estimator consumes:
//!
//! - [`RangeTable`]: ordered, non-overlapping rows over an integer domain
//!   (population, capacity, weekly frequency, day-of-year)
//! - [`CategoricalTable`]: exact-match `key → multiplier`
//!
//! Lookups are total: a value no row matches means "no adjustment" and yields
//! 1.0. Present-but-invalid data is a different animal: every stored
//! multiplier feeds a logarithm downstream, so anything non-finite or <= 0 is
//! a data-entry error that rejects the whole load rather than being quietly
//! coerced to 1.0.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One row of a range table. `max` is inclusive; `None` means open-ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeRow {
    pub min: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
    pub multiplier: f64,
}

/// Ordered, non-overlapping multiplier rows over an integer domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    rows: Vec<RangeRow>,
}

impl RangeTable {
    /// Build a validated table. Deserialized tables must be validated
    /// explicitly via [`RangeTable::validate`] before use.
    pub fn new(rows: Vec<RangeRow>) -> Result<Self, AppError> {
        let table = Self { rows };
        table.validate("range")?;
        Ok(table)
    }

    /// Look up the multiplier for `value`.
    ///
    /// Never fails: an unmatched value is a missing entry and defaults to 1.0.
    pub fn lookup(&self, value: u64) -> f64 {
        for row in &self.rows {
            let upper_ok = row.max.map_or(true, |max| value <= max);
            if value >= row.min && upper_ok {
                return row.multiplier;
            }
        }
        1.0
    }

    /// Enforce the load-time invariants: strictly positive finite multipliers,
    /// rows sorted by `min`, no overlaps, open-ended rows only at the end.
    pub fn validate(&self, table: &str) -> Result<(), AppError> {
        for (i, row) in self.rows.iter().enumerate() {
            if !(row.multiplier.is_finite() && row.multiplier > 0.0) {
                return Err(AppError::input(format!(
                    "Invalid multiplier {} in `{table}` row {i}: multipliers must be finite and > 0.",
                    row.multiplier
                )));
            }
            if let Some(max) = row.max {
                if max < row.min {
                    return Err(AppError::input(format!(
                        "Invalid `{table}` row {i}: max {max} < min {}.",
                        row.min
                    )));
                }
            } else if i + 1 != self.rows.len() {
                return Err(AppError::input(format!(
                    "Invalid `{table}` row {i}: only the last row may be open-ended."
                )));
            }
        }
        for (i, pair) in self.rows.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.min <= prev.min {
                return Err(AppError::input(format!(
                    "`{table}` rows must be sorted by min (rows {i} and {}).",
                    i + 1
                )));
            }
            if prev.max.map_or(true, |max| max >= next.min) {
                return Err(AppError::input(format!(
                    "`{table}` rows {i} and {} overlap.",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Exact-match `key → multiplier` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoricalTable {
    entries: HashMap<String, f64>,
}

impl CategoricalTable {
    pub fn new(entries: HashMap<String, f64>) -> Result<Self, AppError> {
        let table = Self { entries };
        table.validate("categorical")?;
        Ok(table)
    }

    /// Look up the multiplier for `key`; an absent key defaults to 1.0.
    pub fn lookup(&self, key: &str) -> f64 {
        self.entries.get(key).copied().unwrap_or(1.0)
    }

    pub fn validate(&self, table: &str) -> Result<(), AppError> {
        for (key, multiplier) in &self.entries {
            if !(multiplier.is_finite() && *multiplier > 0.0) {
                return Err(AppError::input(format!(
                    "Invalid multiplier {multiplier} for `{key}` in `{table}`: multipliers must be finite and > 0."
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The full bundle of modifier tables one estimation run needs.
///
/// Deserialized from the feature store's `modifiers.json`; the pipeline calls
/// [`ModifierSet::validate`] before the first estimate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifierSet {
    /// Carrier name → multiplier.
    pub airline: CategoricalTable,
    /// City population bands.
    pub population: RangeTable,
    /// Day-of-year bands (1..=366).
    pub season: RangeTable,
    /// Weekly flight frequency bands.
    pub frequency: RangeTable,
    /// Seating capacity bands.
    pub capacity: RangeTable,
    /// Route classification label → multiplier.
    pub route_class: CategoricalTable,
}

impl ModifierSet {
    pub fn validate(&self) -> Result<(), AppError> {
        self.airline.validate("airline")?;
        self.population.validate("population")?;
        self.season.validate("season")?;
        self.frequency.validate("frequency")?;
        self.capacity.validate("capacity")?;
        self.route_class.validate("route_class")
    }
}
