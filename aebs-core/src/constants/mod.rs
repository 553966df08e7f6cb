//! Constants for the AEBS model
//!
//! All calibration values live here with their units and, where one exists,
//! the reference they come from. Code elsewhere should name these constants
//! rather than repeat the numbers.
//!
//! ## Organization
//!
//! - **Physics**: vehicle limits, lag calibration, simulation step
//! - **Profiles**: TTC thresholds and decelerations of the two controllers
//! - **Scenarios**: Euro NCAP-derived initial conditions

/// Vehicle limits, acceleration lag and integration step.
pub mod physics;

/// Industry and Safe controller calibrations.
pub mod profiles;

/// Initial conditions of the named test scenarios.
pub mod scenarios;

// Re-export commonly used constants for convenience
pub use physics::{
    DEFAULT_DT_S, DEFAULT_HORIZON_STEPS, MAX_ACCELERATION_MPS2, MAX_DECELERATION_MPS2,
    MIN_CLOSING_SPEED_MPS, STANDSTILL_SPEED_MPS,
};

pub use scenarios::{DEFAULT_LEAD_ACCEL_BOUND_MPS2, SENSOR_RANGE_M};
