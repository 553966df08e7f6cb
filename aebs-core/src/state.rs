//! Vehicle and relative state
//!
//! `VehicleState` is what the plant integrates; `RelativeState` is derived
//! from an ego/lead pair and is what perception and the controller see.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::MIN_CLOSING_SPEED_MPS;

/// Longitudinal state of one vehicle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleState {
    /// Position along the lane (m)
    pub position: f64,
    /// Speed (m/s), never negative
    pub velocity: f64,
    /// Actual acceleration after the actuator lag (m/s²)
    pub acceleration: f64,
}

impl VehicleState {
    /// Vehicle at `position` cruising at `velocity` with no acceleration
    pub fn cruising(position: f64, velocity: f64) -> Self {
        Self { position, velocity, acceleration: 0.0 }
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }
}

/// Time-to-collision, or the explicit signal that the gap is not shrinking
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeToCollision {
    /// Seconds until contact at the current closing speed (finite, ≥ 0)
    Seconds(f64),
    /// The vehicles are not approaching each other
    NotClosing,
}

impl TimeToCollision {
    /// TTC from a gap and a closing speed (positive when approaching)
    ///
    /// Closing speeds below the floor are raised to it, so any approaching
    /// pair yields a finite value. A negative gap counts as zero.
    pub fn from_gap(gap: f64, closing_speed: f64) -> Self {
        if closing_speed > 0.0 {
            Self::Seconds(gap.max(0.0) / closing_speed.max(MIN_CLOSING_SPEED_MPS))
        } else {
            Self::NotClosing
        }
    }

    /// Seconds, with `NotClosing` mapped to positive infinity
    pub fn as_secs(&self) -> f64 {
        match self {
            Self::Seconds(s) => *s,
            Self::NotClosing => f64::INFINITY,
        }
    }

    /// True when the TTC is strictly below `threshold` seconds
    pub fn below(&self, threshold: f64) -> bool {
        self.as_secs() < threshold
    }
}

/// Ego/lead pair seen from the ego vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RelativeState {
    /// Lead position minus ego position (m); zero or negative means contact
    pub gap: f64,
    /// Lead velocity minus ego velocity (m/s); negative when closing
    pub relative_velocity: f64,
}

impl RelativeState {
    /// Derive the relative state of `lead` with respect to `ego`
    pub fn between(ego: &VehicleState, lead: &VehicleState) -> Self {
        Self {
            gap: lead.position - ego.position,
            relative_velocity: lead.velocity - ego.velocity,
        }
    }

    /// Speed at which the gap shrinks (positive when approaching)
    pub fn closing_speed(&self) -> f64 {
        -self.relative_velocity
    }

    /// Time-to-collision at the current closing speed
    pub fn ttc(&self) -> TimeToCollision {
        TimeToCollision::from_gap(self.gap, self.closing_speed())
    }

    /// Contact has happened
    pub fn is_collision(&self) -> bool {
        self.gap <= 0.0
    }
}
