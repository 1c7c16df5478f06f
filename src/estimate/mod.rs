//! Synthetic price estimation.
//!
//! Responsibilities:
//!
//! - compress raw duration into an effective duration (`duration`)
//! - combine modifier lookups into a rule-based price (`rules`)
//! - fit/predict the regression alternative (`encoder`, `regression`)
//! - clamp either estimate to a plausible price-per-minute range (`bounds`)

pub mod bounds;
pub mod duration;
pub mod encoder;
pub mod regression;
pub mod rules;

pub use bounds::*;
pub use duration::*;
pub use encoder::*;
pub use regression::*;
pub use rules::*;
