//! Input/output helpers.
//!
//! - feature-store ingest + validation (`ingest`)
//! - price-catalog persistence (`catalog`)

pub mod catalog;
pub mod ingest;

pub use catalog::*;
pub use ingest::*;
