//! Duration normalization.
//!
//! Linear cost-per-minute overstates long-haul flights: the 9th hour of a
//! flight is not worth what the 1st is. Beyond a threshold, extra minutes
//! contribute logarithmically-diminishing cost:
//!
//! ```text
//! effective(fd) = fd                                             fd <= threshold
//! effective(fd) = threshold + round(k * ln(1 + (fd - threshold) / k))   otherwise
//! ```
//!
//! `threshold` and `k` are configuration, not constants, so calibration can
//! change without code edits. The function is monotonic non-decreasing and is
//! the identity at or below the threshold.

/// Compress a raw flight duration (minutes) into an effective duration.
///
/// Callers must ensure `k > 0` (enforced by `PricingConfig::validate`).
pub fn effective_minutes(fd: u32, threshold: u32, k: f64) -> u32 {
    if fd <= threshold {
        return fd;
    }
    let extra = f64::from(fd - threshold);
    threshold + (k * (1.0 + extra / k).ln()).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_at_or_below_threshold() {
        for fd in 0..=80 {
            assert_eq!(effective_minutes(fd, 80, 50.0), fd);
        }
    }

    #[test]
    fn six_hour_flight_compresses_to_174() {
        // 360 minutes: 80 + round(50 * ln(1 + 280/50)) = 80 + 94 = 174.
        assert_eq!(effective_minutes(360, 80, 50.0), 174);
    }

    #[test]
    fn monotonic_non_decreasing() {
        let mut prev = 0;
        for fd in 0..2_000 {
            let eff = effective_minutes(fd, 80, 50.0);
            assert!(eff >= prev, "effective duration decreased at fd={fd}: {eff} < {prev}");
            prev = eff;
        }
    }

    #[test]
    fn sublinear_beyond_threshold() {
        // Each equal step beyond the threshold must add less than the last.
        let threshold = 80;
        for delta in [10u32, 50, 120, 400] {
            let e0 = effective_minutes(threshold, threshold, 50.0);
            let e1 = effective_minutes(threshold + delta, threshold, 50.0);
            let e2 = effective_minutes(threshold + 2 * delta, threshold, 50.0);
            assert!(
                e2 - e1 < e1 - e0,
                "expected diminishing increments at delta={delta}: {e0} {e1} {e2}"
            );
        }
    }

    #[test]
    fn threshold_and_k_are_tunable() {
        // With a 200-minute threshold, a 100-minute flight is untouched.
        assert_eq!(effective_minutes(100, 200, 50.0), 100);
        // A larger k compresses less.
        assert!(effective_minutes(360, 80, 100.0) > effective_minutes(360, 80, 25.0));
    }
}
