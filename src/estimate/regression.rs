//! Regression price estimator.
//!
//! The alternative to the rule-based model: ordinary least squares over the
//! route's numeric and encoded categorical features, trained on routes whose
//! actual market price is known.
//!
//! Two-phase API:
//! - [`fit`] consumes the labeled rows and returns an immutable
//!   [`RegressionModel`] (coefficients + the frozen encoder snapshot).
//! - [`RegressionModel::predict`] applies it. Because prediction needs a model
//!   value that only `fit` can produce, predict-before-fit is unrepresentable
//!   rather than a runtime error.
//!
//! Encoded categories are fed to OLS as plain numbers. That is a known
//! approximation (the model is not categorical-safe); unseen categories at
//! prediction time land in the encoder's unknown bucket.

use nalgebra::{DMatrix, DVector};

use crate::domain::{PricingConfig, RouteRecord};
use crate::error::AppError;
use crate::estimate::duration::effective_minutes;
use crate::estimate::encoder::{CategoryEncoder, CategoryScope};
use crate::math::solve_least_squares;

/// Columns of the design matrix:
/// `[1, originPop, destPop, frequency, origin, destination, airline,
///   routeClass, aircraft, capacity, effectiveMinutes]`.
pub const FEATURE_COLUMNS: usize = 11;

/// Minimum labeled rows beyond the column count required to fit.
const MIN_ROWS_BUFFER: usize = 5;

/// Fitted coefficients plus the encoder snapshot that produced them.
///
/// Immutable after `fit`; safe to share across prediction workers.
#[derive(Debug, Clone)]
pub struct RegressionModel {
    coefficients: Vec<f64>,
    encoder: CategoryEncoder,
    n_obs: usize,
    rmse: f64,
}

impl RegressionModel {
    /// Predict a price for one route.
    pub fn predict(&self, route: &RouteRecord, effective_minutes: u32) -> f64 {
        let codes = lookup_codes(&self.encoder, route);
        let row = feature_row(route, effective_minutes, &codes);
        row.iter()
            .zip(self.coefficients.iter())
            .map(|(x, b)| x * b)
            .sum()
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Training error in price units.
    pub fn rmse(&self) -> f64 {
        self.rmse
    }
}

/// Fit the price model over every labeled route in `records`.
///
/// Rows without an actual price are ignored. Fewer labeled rows than the
/// column count (plus a small buffer) leaves the system underdetermined and
/// is an error, as is an observed price that is not finite and positive.
pub fn fit(records: &[RouteRecord], config: &PricingConfig) -> Result<RegressionModel, AppError> {
    let labeled: Vec<(&RouteRecord, f64)> = records
        .iter()
        .filter_map(|r| r.actual_price.map(|p| (r, p)))
        .collect();

    let n = labeled.len();
    let min_rows = FEATURE_COLUMNS + MIN_ROWS_BUFFER;
    if n < min_rows {
        return Err(AppError::data(format!(
            "Too few labeled routes to fit the regression estimator: {n} < {min_rows}."
        )));
    }

    for (route, price) in &labeled {
        if !(price.is_finite() && *price > 0.0) {
            return Err(AppError::data(format!(
                "Invalid observed price {price} for labeled route {}.",
                route.key()
            )));
        }
    }

    let mut encoder = CategoryEncoder::new();
    let mut x = DMatrix::<f64>::zeros(n, FEATURE_COLUMNS);
    let mut y = DVector::<f64>::zeros(n);

    for (i, (route, price)) in labeled.iter().enumerate() {
        let eff = effective_minutes(
            route.duration_minutes,
            config.duration_threshold,
            config.log_k,
        );
        let codes = mint_codes(&mut encoder, route);
        let row = feature_row(route, eff, &codes);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
        y[i] = *price;
    }

    let beta = solve_least_squares(&x, &y).ok_or_else(|| {
        AppError::internal("Regression design matrix is too ill-conditioned to solve.")
    })?;

    // Training RMSE, reported in the run summary so calibration drift is visible.
    let residuals = &y - &x * &beta;
    let rmse = (residuals.iter().map(|r| r * r).sum::<f64>() / n as f64).sqrt();

    encoder.freeze();

    Ok(RegressionModel {
        coefficients: beta.iter().copied().collect(),
        encoder,
        n_obs: n,
        rmse,
    })
}

/// Per-scope codes for one route.
struct ScopeCodes {
    origin: u32,
    destination: u32,
    airline: u32,
    route_class: u32,
    aircraft: u32,
}

fn mint_codes(encoder: &mut CategoryEncoder, route: &RouteRecord) -> ScopeCodes {
    ScopeCodes {
        origin: encoder.encode(CategoryScope::Origin, &route.origin),
        destination: encoder.encode(CategoryScope::Destination, &route.destination),
        airline: encoder.encode(CategoryScope::Airline, &route.carrier),
        route_class: encoder.encode(CategoryScope::RouteClass, route.class.label()),
        aircraft: encoder.encode(CategoryScope::Aircraft, &route.aircraft),
    }
}

fn lookup_codes(encoder: &CategoryEncoder, route: &RouteRecord) -> ScopeCodes {
    ScopeCodes {
        origin: encoder.code(CategoryScope::Origin, &route.origin),
        destination: encoder.code(CategoryScope::Destination, &route.destination),
        airline: encoder.code(CategoryScope::Airline, &route.carrier),
        route_class: encoder.code(CategoryScope::RouteClass, route.class.label()),
        aircraft: encoder.code(CategoryScope::Aircraft, &route.aircraft),
    }
}

fn feature_row(
    route: &RouteRecord,
    effective_minutes: u32,
    codes: &ScopeCodes,
) -> [f64; FEATURE_COLUMNS] {
    [
        1.0,
        route.origin_population as f64,
        route.destination_population as f64,
        f64::from(route.weekly_frequency),
        f64::from(codes.origin),
        f64::from(codes.destination),
        f64::from(codes.airline),
        f64::from(codes.route_class),
        f64::from(codes.aircraft),
        f64::from(route.capacity),
        f64::from(effective_minutes),
    ]
}
