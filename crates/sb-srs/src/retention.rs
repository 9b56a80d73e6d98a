//! Forgetting-curve retention estimate.

use crate::SrsError;

/// Memory strength used when a caller has no better estimate.
pub const DEFAULT_STRENGTH: f64 = 1.0;

/// Stability in days for a strength of 1.0.
const BASE_STABILITY_DAYS: f64 = 10.0;

/// Estimate current retention based on the forgetting curve.
///
/// Uses `R = e^(-t / S)` where `t` is the elapsed time in days and
/// `S = strength * 10` is the memory stability.
///
/// # Arguments
///
/// * `days_since_review` - Days since the last review, fractional allowed
/// * `strength` - Memory strength factor (higher means slower forgetting)
///
/// # Returns
///
/// Estimated recall probability in `[0, 1]`.
pub fn estimate_retention(days_since_review: f64, strength: f64) -> Result<f64, SrsError> {
    // Written so that NaN is rejected too.
    if !(days_since_review >= 0.0) {
        return Err(SrsError::InvalidArgument(format!(
            "days since review must be non-negative, got {days_since_review}"
        )));
    }
    if !strength.is_finite() || strength <= 0.0 {
        return Err(SrsError::InvalidArgument(format!(
            "strength must be finite and positive, got {strength}"
        )));
    }

    let stability = strength * BASE_STABILITY_DAYS;
    let retention = (-days_since_review / stability).exp();
    Ok(retention.clamp(0.0, 1.0))
}
