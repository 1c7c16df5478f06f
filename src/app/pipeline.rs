//! Batch estimation pipeline shared by the CLI and any future embedding.
//!
//! One run walks fixed phases:
//! load tables + records -> fit regression (strategy permitting) ->
//! estimate per record -> persist through one writer -> summarize.
//!
//! Records are independent, so estimation fans out over the rayon pool; the
//! shared state it reads (modifier tables, fitted model, frozen encoder) is
//! immutable by then. Per-record failures are counted and skipped; the run
//! only aborts on structural problems (bad tables, bad config, an unfittable
//! regression under `strategy=regression`).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::{PriceEstimate, PriceSource, PricingConfig, RouteRecord, Strategy};
use crate::error::AppError;
use crate::estimate::bounds::{self, validate_brackets};
use crate::estimate::duration::effective_minutes;
use crate::estimate::regression::{self, RegressionModel};
use crate::estimate::rules;
use crate::io::catalog::EstimateSink;
use crate::io::ingest::{self, IngestedRoutes, RowError};
use crate::tables::ModifierSet;

/// Counters the run summary is built from. A batch never ends in silent
/// partial success: these are always reported.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Rows carrying an observed market price (regression training set).
    pub labeled_rows: usize,
    pub estimated: usize,
    pub estimate_failures: usize,
    pub zero_priced: usize,
    pub cancelled: usize,
    pub persist_failures: usize,
}

/// All computed outputs of a single `estimate-prices` run.
#[derive(Debug)]
pub struct RunOutput {
    pub estimates: Vec<PriceEstimate>,
    pub row_errors: Vec<RowError>,
    /// Per-record estimation failures: `(route key, message)`.
    pub estimate_errors: Vec<(String, String)>,
    /// Per-record persistence failures: `(route key, message)`.
    pub persist_errors: Vec<(String, String)>,
    /// Regression diagnostics when a model was fitted: `(n_obs, rmse)`.
    pub model_stats: Option<(usize, f64)>,
    /// Why `strategy=both` fell back to rule-based, when it did.
    pub fallback_reason: Option<String>,
    pub summary: RunSummary,
}

/// Execute the full pipeline against the feature store named in `config`.
pub fn run_estimate(
    config: &PricingConfig,
    sink: &mut dyn EstimateSink,
    cancel: &AtomicBool,
) -> Result<RunOutput, AppError> {
    let tables = ingest::load_modifier_tables(&config.store_dir.join("modifiers.json"))?;
    let routes = ingest::load_route_records(&config.store_dir.join("routes.csv"))?;

    run_with_inputs(config, tables, routes, sink, cancel)
}

/// Execute the pipeline with pre-loaded inputs.
///
/// This is the testable core: the CLI front-end only adds file loading around
/// it.
pub fn run_with_inputs(
    config: &PricingConfig,
    tables: ModifierSet,
    routes: IngestedRoutes,
    sink: &mut dyn EstimateSink,
    cancel: &AtomicBool,
) -> Result<RunOutput, AppError> {
    config.validate()?;
    validate_brackets(&config.brackets)?;
    tables.validate()?;

    // Fit barrier: the model must exist (immutably) before any predict runs.
    let mut fallback_reason = None;
    let model: Option<RegressionModel> = match config.strategy {
        Strategy::RuleBased => None,
        Strategy::Regression => Some(regression::fit(&routes.records, config)?),
        Strategy::Both => match regression::fit(&routes.records, config) {
            Ok(model) => Some(model),
            Err(e) => {
                fallback_reason = Some(e.to_string());
                None
            }
        },
    };

    let outcomes: Vec<Option<Result<PriceEstimate, (String, String)>>> = routes
        .records
        .par_iter()
        .map(|route| {
            // Cancellation is observed between records, never mid-record.
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            Some(estimate_one(route, &tables, model.as_ref(), config))
        })
        .collect();

    let mut estimates = Vec::new();
    let mut estimate_errors = Vec::new();
    let mut cancelled = 0usize;
    for outcome in outcomes {
        match outcome {
            Some(Ok(estimate)) => estimates.push(estimate),
            Some(Err(failure)) => estimate_errors.push(failure),
            None => cancelled += 1,
        }
    }

    // Single writer path: most embedded destinations dislike concurrent
    // writers, and one failed write must not take the others down with it.
    let mut persist_errors = Vec::new();
    for estimate in &estimates {
        if let Err(e) = sink.upsert(estimate) {
            persist_errors.push((estimate.key(), e.to_string()));
        }
    }
    sink.flush()?;

    let summary = RunSummary {
        rows_read: routes.rows_read,
        rows_skipped: routes.row_errors.len(),
        labeled_rows: routes.labeled_rows,
        estimated: estimates.len(),
        estimate_failures: estimate_errors.len(),
        zero_priced: estimates.iter().filter(|e| e.price == 0.0).count(),
        cancelled,
        persist_failures: persist_errors.len(),
    };

    Ok(RunOutput {
        estimates,
        row_errors: routes.row_errors,
        estimate_errors,
        persist_errors,
        model_stats: model.as_ref().map(|m| (m.n_obs(), m.rmse())),
        fallback_reason,
        summary,
    })
}

/// Estimate and boundary-correct one route.
///
/// Failures here are data-shaped (a record the estimators cannot price) and
/// are reported per record; structural problems were rejected before the
/// batch started.
fn estimate_one(
    route: &RouteRecord,
    tables: &ModifierSet,
    model: Option<&RegressionModel>,
    config: &PricingConfig,
) -> Result<PriceEstimate, (String, String)> {
    let eff = effective_minutes(route.duration_minutes, config.duration_threshold, config.log_k);

    let (raw_price, source, breakdown) = match model {
        Some(model) => (model.predict(route, eff), PriceSource::Regression, None),
        None => {
            let (price, breakdown) = rules::estimate(route, eff, tables, config)
                .map_err(|e| (route.key(), e.to_string()))?;
            (price, PriceSource::RuleBased, Some(breakdown))
        }
    };

    if !raw_price.is_finite() {
        return Err((
            route.key(),
            format!("Non-finite {} estimate", source.display_name()),
        ));
    }

    let mut rng = StdRng::seed_from_u64(record_seed(config.seed, route));
    let corrected = bounds::correct(
        raw_price,
        eff,
        &config.brackets,
        &mut rng,
        config.jitter_enabled,
    );

    Ok(PriceEstimate {
        origin: route.origin.clone(),
        destination: route.destination.clone(),
        price: corrected.price,
        source,
        effective_minutes: eff,
        breakdown,
    })
}

/// Per-record jitter seed.
///
/// Derived from the run seed and the route key, never from the record's
/// position in the batch, so output is identical however the pool schedules
/// the records.
fn record_seed(run_seed: u64, route: &RouteRecord) -> u64 {
    let mut hasher = DefaultHasher::new();
    run_seed.hash(&mut hasher);
    route.origin.hash(&mut hasher);
    route.destination.hash(&mut hasher);
    hasher.finish()
}
