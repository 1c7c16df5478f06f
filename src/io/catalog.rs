//! Price catalog persistence.
//!
//! The engine's only output contract: one [`PriceEstimate`] per processed
//! route, upserted by `"ORG-DST"` key so a re-run overwrites rather than
//! duplicates. [`EstimateSink`] is the seam the pipeline writes through;
//! [`JsonCatalog`] is the shipped implementation, a single JSON document
//! loaded and merged on open, written back on flush. [`MemorySink`] backs
//! embedders and tests.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::domain::PriceEstimate;
use crate::error::AppError;

/// Where finished estimates go. One writer path per run; a rejected record
/// is reported and skipped, never retried here.
pub trait EstimateSink {
    /// Insert or overwrite the estimate for its route key.
    fn upsert(&mut self, estimate: &PriceEstimate) -> Result<(), AppError>;

    /// Make everything upserted so far durable.
    fn flush(&mut self) -> Result<(), AppError>;
}

/// JSON-file catalog keyed by `"ORG-DST"`.
///
/// A `BTreeMap` keeps the document ordered so diffs between runs stay
/// readable.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    entries: BTreeMap<String, PriceEstimate>,
}

impl JsonCatalog {
    /// Open a catalog, merging any existing document at `path`.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let entries = if path.exists() {
            let file = File::open(path).map_err(|e| {
                AppError::input(format!("Failed to open catalog '{}': {e}", path.display()))
            })?;
            serde_json::from_reader(file).map_err(|e| {
                AppError::input(format!("Invalid catalog JSON '{}': {e}", path.display()))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PriceEstimate> {
        self.entries.get(key)
    }
}

impl EstimateSink for JsonCatalog {
    fn upsert(&mut self, estimate: &PriceEstimate) -> Result<(), AppError> {
        validate_key(estimate)?;
        self.entries.insert(estimate.key(), estimate.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AppError> {
        let file = File::create(&self.path).map_err(|e| {
            AppError::input(format!(
                "Failed to create catalog '{}': {e}",
                self.path.display()
            ))
        })?;
        serde_json::to_writer_pretty(file, &self.entries).map_err(|e| {
            AppError::input(format!(
                "Failed to write catalog '{}': {e}",
                self.path.display()
            ))
        })
    }
}

/// In-memory sink for embedders and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entries: BTreeMap<String, PriceEstimate>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EstimateSink for MemorySink {
    fn upsert(&mut self, estimate: &PriceEstimate) -> Result<(), AppError> {
        validate_key(estimate)?;
        self.entries.insert(estimate.key(), estimate.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}

fn validate_key(estimate: &PriceEstimate) -> Result<(), AppError> {
    if estimate.origin.is_empty() || estimate.destination.is_empty() {
        return Err(AppError::input(format!(
            "Estimate with empty route key '{}' rejected by catalog.",
            estimate.key()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceSource;

    fn estimate(origin: &str, destination: &str, price: f64) -> PriceEstimate {
        PriceEstimate {
            origin: origin.to_string(),
            destination: destination.to_string(),
            price,
            source: PriceSource::RuleBased,
            effective_minutes: 90,
            breakdown: None,
        }
    }

    #[test]
    fn upsert_overwrites_by_route_key() {
        let mut sink = MemorySink::new();
        sink.upsert(&estimate("OSL", "TRD", 100.0)).unwrap();
        sink.upsert(&estimate("OSL", "TRD", 80.0)).unwrap();
        sink.upsert(&estimate("OSL", "BGO", 95.0)).unwrap();

        assert_eq!(sink.entries.len(), 2);
        assert_eq!(sink.entries.get("OSL-TRD").unwrap().price, 80.0);
    }

    #[test]
    fn empty_route_key_is_rejected_per_record() {
        let mut sink = MemorySink::new();
        assert!(sink.upsert(&estimate("", "TRD", 100.0)).is_err());
        assert!(sink.entries.is_empty());
    }
}
