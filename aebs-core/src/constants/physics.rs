//! Physical Constants for the Vehicle Model
//!
//! Limits and calibration of the longitudinal point-mass model with a
//! first-order acceleration lag. Both ego and lead vehicle use the same
//! values.

// ===== VEHICLE LIMITS =====

/// Maximum deceleration magnitude (m/s²).
///
/// Roughly 1 g, the friction limit of a passenger car on dry asphalt.
/// Commands beyond this are clamped by the plant.
///
/// Source: ARCH-COMP20 AV benchmark, discrete-time N1 vehicle model
pub const MAX_DECELERATION_MPS2: f64 = 9.8;

/// Maximum forward acceleration (m/s²).
///
/// Upper edge of the acceleration envelope used by the abstraction grid.
pub const MAX_ACCELERATION_MPS2: f64 = 5.0;

// ===== ACCELERATION LAG =====

/// Reference step at which the lag gain is calibrated (s).
pub const LAG_REFERENCE_DT_S: f64 = 0.1;

/// Fraction of the command error closed per reference step.
///
/// `a' = a + 0.5 (u - a)` at `dt = 0.1 s`. The plant converts this into a
/// time constant so other step sizes discretize the same continuous lag.
pub const LAG_GAIN_AT_REFERENCE: f64 = 0.5;

/// Time constant of the acceleration lag (s).
///
/// `τ = -dt_ref / ln(1 - α_ref) = 0.1 / ln 2 ≈ 0.144 s`.
pub const LAG_TIME_CONSTANT_S: f64 = LAG_REFERENCE_DT_S / core::f64::consts::LN_2;

// ===== NUMERICS =====

/// Floor on the closing speed in the TTC denominator (m/s).
///
/// Keeps TTC finite for vanishing closing speeds instead of dividing by
/// (almost) zero.
pub const MIN_CLOSING_SPEED_MPS: f64 = 1e-3;

/// Speed below which a vehicle counts as stopped (m/s).
pub const STANDSTILL_SPEED_MPS: f64 = 0.1;

// ===== SIMULATION =====

/// Default control and integration step (s).
pub const DEFAULT_DT_S: f64 = 0.1;

/// Default step budget for one run (30 s at the default step).
pub const DEFAULT_HORIZON_STEPS: usize = 300;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lag_constant_reproduces_reference_gain() {
        let alpha = 1.0 - libm::exp(-LAG_REFERENCE_DT_S / LAG_TIME_CONSTANT_S);
        assert!((alpha - LAG_GAIN_AT_REFERENCE).abs() < 1e-12);
    }
}
