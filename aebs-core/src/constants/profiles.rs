//! Controller Calibrations
//!
//! Two fixed TTC-threshold calibrations. All thresholds are in seconds of
//! time-to-collision; decelerations are magnitudes in m/s².

// ===== INDUSTRY (late, comfort-first braking) =====

/// TTC below which the Industry controller warns the driver.
pub const INDUSTRY_TTC_WARNING_S: f64 = 2.6;

/// TTC below which the Industry controller applies partial braking.
pub const INDUSTRY_TTC_PARTIAL_S: f64 = 1.6;

/// TTC below which the Industry controller brakes at full force.
///
/// The sub-second trigger typical of production systems tuned against
/// false activations.
pub const INDUSTRY_TTC_EMERGENCY_S: f64 = 1.0;

/// Industry Warning deceleration: acoustic warning only.
pub const INDUSTRY_DECEL_WARNING_MPS2: f64 = 0.0;

/// Industry partial-braking deceleration.
pub const INDUSTRY_DECEL_PARTIAL_MPS2: f64 = 4.0;

/// Industry emergency deceleration (friction limit).
pub const INDUSTRY_DECEL_EMERGENCY_MPS2: f64 = 9.8;

/// Margin above a mode's trigger that TTC must clear before the Industry
/// controller relaxes out of it.
pub const INDUSTRY_HYSTERESIS_S: f64 = 0.3;

// ===== SAFE (early, margin-first braking) =====

/// TTC below which the Safe controller starts pre-braking.
pub const SAFE_TTC_WARNING_S: f64 = 6.0;

/// TTC below which the Safe controller applies partial braking.
pub const SAFE_TTC_PARTIAL_S: f64 = 5.0;

/// TTC below which the Safe controller brakes at full force.
pub const SAFE_TTC_EMERGENCY_S: f64 = 4.0;

/// Safe Warning deceleration: brake pre-fill with light braking.
pub const SAFE_DECEL_WARNING_MPS2: f64 = 3.0;

/// Safe partial-braking deceleration.
///
/// Kept close to the emergency level so a single missed detection (which
/// relaxes Emergency to Partial) costs little stopping distance.
pub const SAFE_DECEL_PARTIAL_MPS2: f64 = 8.0;

/// Safe emergency deceleration (friction limit).
pub const SAFE_DECEL_EMERGENCY_MPS2: f64 = 9.8;

/// Relaxation margin of the Safe controller.
pub const SAFE_HYSTERESIS_S: f64 = 0.5;
