//! Boundary correction: clamp estimates to a plausible price-per-minute range.
//!
//! Synthetic estimates occasionally drift far outside anything a traveler
//! would recognize. Each duration bracket carries a plausible PPM band; when
//! `rawPrice / effectiveMinutes` falls outside it, the price is rebuilt from
//! the violated bound with a little jitter so that many routes in the same
//! bracket don't collapse to one identical clamped price.
//!
//! Short brackets have no upper clamp. Instead they carry an implausibility
//! ceiling: a short-haul estimate still absurdly expensive after correction is
//! zeroed, and the zero tells the catalog consumer "do not trust this
//! estimate" instead of handing it a misleadingly precise number.
//!
//! Jitter comes from a caller-supplied seeded RNG, so identical inputs and
//! seed reproduce identical output (the pipeline derives one RNG per route
//! from the run seed).

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::PpmBracket;
use crate::error::AppError;

/// Outcome of boundary correction for one estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corrected {
    pub price: f64,
    /// True when the price was rebuilt from a violated bound.
    pub clamped: bool,
    /// True when the estimate was zeroed as untrustworthy.
    pub zeroed: bool,
}

/// Default bracket table; deployments override it via `--brackets`.
pub fn default_brackets() -> Vec<PpmBracket> {
    let short = |max_minutes: u32| PpmBracket {
        max_minutes: Some(max_minutes),
        min_ppm: 0.9,
        max_ppm: None,
        zero_above_ppm: Some(4.0),
        jitter: (0.9, 1.1),
    };
    vec![
        short(60),
        short(120),
        short(240),
        PpmBracket {
            max_minutes: None,
            min_ppm: 1.4,
            max_ppm: Some(2.3),
            zero_above_ppm: None,
            jitter: (0.95, 1.05),
        },
    ]
}

/// Clamp `raw_price` into the PPM band of the bracket covering
/// `effective_minutes`.
///
/// `jitter_enabled = false` pins the jitter sample to 1.0 so golden runs are
/// bit-identical.
pub fn correct(
    raw_price: f64,
    effective_minutes: u32,
    brackets: &[PpmBracket],
    rng: &mut StdRng,
    jitter_enabled: bool,
) -> Corrected {
    if effective_minutes == 0 || !raw_price.is_finite() {
        return Corrected {
            price: 0.0,
            clamped: false,
            zeroed: true,
        };
    }

    let Some(bracket) = pick_bracket(brackets, effective_minutes) else {
        return Corrected {
            price: raw_price,
            clamped: false,
            zeroed: false,
        };
    };

    let eff = f64::from(effective_minutes);
    let ppm = raw_price / eff;

    let mut price = raw_price;
    let mut clamped = false;

    if ppm < bracket.min_ppm {
        price = bracket.min_ppm * eff * jitter_sample(bracket, rng, jitter_enabled);
        clamped = true;
    } else if let Some(max_ppm) = bracket.max_ppm {
        if ppm > max_ppm {
            price = max_ppm * eff * jitter_sample(bracket, rng, jitter_enabled);
            clamped = true;
        }
    }

    if let Some(ceiling) = bracket.zero_above_ppm {
        if price / eff > ceiling {
            return Corrected {
                price: 0.0,
                clamped,
                zeroed: true,
            };
        }
    }

    Corrected {
        price,
        clamped,
        zeroed: false,
    }
}

fn pick_bracket(brackets: &[PpmBracket], effective_minutes: u32) -> Option<&PpmBracket> {
    brackets
        .iter()
        .find(|b| b.max_minutes.map_or(true, |max| effective_minutes <= max))
}

fn jitter_sample(bracket: &PpmBracket, rng: &mut StdRng, jitter_enabled: bool) -> f64 {
    if !jitter_enabled {
        return 1.0;
    }
    let (lo, hi) = bracket.jitter;
    rng.gen_range(lo..=hi)
}

/// Enforce the bracket-table invariants at configuration time.
///
/// The table must be non-empty, sorted by `max_minutes` with exactly one
/// open-ended final bracket, and every bound/jitter value must be usable.
pub fn validate_brackets(brackets: &[PpmBracket]) -> Result<(), AppError> {
    if brackets.is_empty() {
        return Err(AppError::input("PPM bracket table must not be empty."));
    }

    let mut prev_max = 0u32;
    for (i, bracket) in brackets.iter().enumerate() {
        match bracket.max_minutes {
            Some(max) => {
                if i + 1 == brackets.len() {
                    return Err(AppError::input(
                        "The last PPM bracket must be open-ended (no max_minutes).",
                    ));
                }
                if max <= prev_max && i > 0 {
                    return Err(AppError::input(format!(
                        "PPM brackets must be sorted by max_minutes (bracket {i})."
                    )));
                }
                prev_max = max;
            }
            None => {
                if i + 1 != brackets.len() {
                    return Err(AppError::input(format!(
                        "Only the last PPM bracket may be open-ended (bracket {i})."
                    )));
                }
            }
        }

        if !(bracket.min_ppm.is_finite() && bracket.min_ppm > 0.0) {
            return Err(AppError::input(format!(
                "Invalid min PPM {} in bracket {i}.",
                bracket.min_ppm
            )));
        }
        if let Some(max_ppm) = bracket.max_ppm {
            if !(max_ppm.is_finite() && max_ppm >= bracket.min_ppm) {
                return Err(AppError::input(format!(
                    "Invalid max PPM {max_ppm} in bracket {i}: must be finite and >= min PPM."
                )));
            }
        }
        if let Some(ceiling) = bracket.zero_above_ppm {
            if !(ceiling.is_finite() && ceiling >= bracket.min_ppm) {
                return Err(AppError::input(format!(
                    "Invalid zero-above PPM {ceiling} in bracket {i}: must be finite and >= min PPM."
                )));
            }
        }
        let (lo, hi) = bracket.jitter;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && hi >= lo) {
            return Err(AppError::input(format!(
                "Invalid jitter range [{lo}, {hi}] in bracket {i}."
            )));
        }
    }

    Ok(())
}
