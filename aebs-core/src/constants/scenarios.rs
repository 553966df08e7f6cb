//! Scenario Constants
//!
//! Initial conditions of the named scenarios. Speeds follow the Euro NCAP
//! AEB City and Inter-Urban protocols; gaps are chosen to sit at
//! characteristic TTC values.

// ===== URBAN (AEB City) =====

/// Urban ego speed: 36 km/h (m/s).
///
/// Source: Euro NCAP AEB City protocol, 10-50 km/h test range
pub const URBAN_EGO_SPEED_MPS: f64 = 10.0;

/// Urban static-target initial gap (m). TTC 4.0 s at urban speed.
pub const URBAN_STATIC_GAP_M: f64 = 40.0;

/// Urban cut-out gap (m). TTC 1.5 s, the reaction-time boundary.
pub const URBAN_CUTOUT_GAP_M: f64 = 15.0;

// ===== HIGHWAY (AEB Inter-Urban) =====

/// Highway ego speed: 90 km/h (m/s).
///
/// Source: Euro NCAP AEB Inter-Urban protocol stress-test limit
pub const HIGHWAY_EGO_SPEED_MPS: f64 = 25.0;

/// Highway static-target gap (m), long-range radar detection.
pub const HIGHWAY_STATIC_GAP_M: f64 = 120.0;

/// Highway cut-out gap (m).
///
/// TTC 1.6 s. Stopping from 25 m/s at 9.8 m/s² takes about 32 m, so this
/// sits at the edge of what full braking can absorb.
pub const HIGHWAY_CUTOUT_GAP_M: f64 = 40.0;

/// Highway traffic: lead cruising at ego speed (m/s).
pub const HIGHWAY_TRAFFIC_LEAD_SPEED_MPS: f64 = 25.0;

/// Highway traffic initial gap (m).
pub const HIGHWAY_TRAFFIC_GAP_M: f64 = 40.0;

// ===== LEAD AND SENSOR =====

/// Bound on the random acceleration of an unpredictable lead (m/s²).
pub const DEFAULT_LEAD_ACCEL_BOUND_MPS2: f64 = 2.0;

/// Detection range of the perception stack (m).
///
/// Obstacles beyond this distance are not present for the sensor at all.
pub const SENSOR_RANGE_M: f64 = 100.0;
