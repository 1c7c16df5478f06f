//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - route inputs (`RouteRecord`, `RouteClass`)
//! - estimation outputs (`PriceEstimate`, `ModifierBreakdown`)
//! - run configuration (`PricingConfig`, `Weights`, `PpmBracket`)

pub mod types;

pub use types::*;
