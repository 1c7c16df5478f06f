//! Mathematical utilities: the least-squares solver behind the regression estimator.

pub mod ols;

pub use ols::*;
