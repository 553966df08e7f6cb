//! Configuration errors
//!
//! Every configuration surface (`SimulationConfig`, `Scenario`,
//! `ControllerProfile`, `PlantParams`, and the grid/abstraction settings in
//! `aebs-imdp`) is validated up front and reports one of these variants.
//! Nothing mid-simulation returns an error: a crash is a trajectory outcome,
//! and numerical degeneracy in TTC is handled by the closing-speed floor.
//!
//! Variants carry `&'static str` field names and the offending values so the
//! enum stays `Copy` and cheap to return.
//!
//! ```rust
//! use aebs_core::{ConfigError, Scenario, ProfileKind, SimulationConfig};
//!
//! let config = SimulationConfig::new(Scenario::urban_static(), ProfileKind::Safe)
//!     .with_noise_rate(1.5);
//!
//! match config.validate() {
//!     Err(ConfigError::OutOfRange { field, .. }) => assert_eq!(field, "noise_rate"),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected configuration values
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Value outside its admissible range
    #[error("{field} = {value} outside range [{min}, {max}]")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The supplied value
        value: f64,
        /// Smallest admissible value
        min: f64,
        /// Largest admissible value
        max: f64,
    },

    /// Value must be strictly positive (step sizes, resolutions, limits)
    #[error("{field} = {value} must be positive")]
    NonPositive {
        /// Name of the offending field
        field: &'static str,
        /// The supplied value
        value: f64,
    },

    /// Value must not be negative (velocities, noise levels)
    #[error("{field} = {value} must not be negative")]
    Negative {
        /// Name of the offending field
        field: &'static str,
        /// The supplied value
        value: f64,
    },

    /// NaN or infinity where a real number is required
    #[error("{field} is not a finite number")]
    NonFinite {
        /// Name of the offending field
        field: &'static str,
    },

    /// Lower bound not below upper bound
    #[error("{field}: empty range [{lo}, {hi}]")]
    EmptyRange {
        /// Name of the offending range
        field: &'static str,
        /// Lower bound
        lo: f64,
        /// Upper bound
        hi: f64,
    },

    /// Thresholds that must be strictly ordered are not
    #[error("{field}: thresholds must satisfy {relation}")]
    Unordered {
        /// Name of the offending group of values
        field: &'static str,
        /// The required relation, for the message
        relation: &'static str,
    },

    /// Zero where a count is required (horizon, runs)
    #[error("{field} must be at least 1")]
    ZeroCount {
        /// Name of the offending field
        field: &'static str,
    },

    /// JSON input could not be decoded
    #[error("malformed configuration: {reason}")]
    Malformed {
        /// Short description of the decoding failure category
        reason: &'static str,
    },
}

/// Reject NaN and infinities
pub fn check_finite(field: &'static str, value: f64) -> ConfigResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite { field })
    }
}

/// Require a finite value strictly above zero
pub fn check_positive(field: &'static str, value: f64) -> ConfigResult<f64> {
    check_finite(field, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

/// Require a finite value at or above zero
pub fn check_non_negative(field: &'static str, value: f64) -> ConfigResult<f64> {
    check_finite(field, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Require a finite value inside `[min, max]`
pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ConfigResult<f64> {
    check_finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange { field, value, min, max })
    }
}

/// Require the finite interval `[lo, hi]` to be non-empty with `lo < hi`
pub fn check_span(field: &'static str, lo: f64, hi: f64) -> ConfigResult<(f64, f64)> {
    check_finite(field, lo)?;
    check_finite(field, hi)?;
    if lo < hi {
        Ok((lo, hi))
    } else {
        Err(ConfigError::EmptyRange { field, lo, hi })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_reports_bounds() {
        let err = check_range("noise_rate", -0.1, 0.0, 1.0).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange { field: "noise_rate", value: -0.1, min: 0.0, max: 1.0 }
        );
        assert!(check_range("noise_rate", 1.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn nan_is_never_accepted() {
        assert_eq!(
            check_positive("dt", f64::NAN),
            Err(ConfigError::NonFinite { field: "dt" })
        );
        assert!(check_non_negative("v", f64::INFINITY).is_err());
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(matches!(
            check_positive("dt", 0.0),
            Err(ConfigError::NonPositive { .. })
        ));
        assert!(check_non_negative("v", 0.0).is_ok());
    }

    #[test]
    fn span_requires_strict_order() {
        assert!(check_span("gap", 0.0, 100.0).is_ok());
        assert!(matches!(
            check_span("gap", 5.0, 5.0),
            Err(ConfigError::EmptyRange { .. })
        ));
    }

    #[test]
    fn messages_name_the_field() {
        let msg = ConfigError::NonPositive { field: "resolution.gap", value: 0.0 }.to_string();
        assert!(msg.contains("resolution.gap"));
    }
}
