//! Stochastic perception
//!
//! Models an object detector with a false-negative rate and a fixed sensor
//! range. The detector may miss an obstacle that is there; it never reports
//! one that is not. This is the only source of randomness the abstraction
//! has to account for.
//!
//! Randomness comes from the caller. Passing the same seeded generator
//! reproduces a run exactly.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::SENSOR_RANGE_M,
    errors::{check_positive, check_range, ConfigResult},
    state::{RelativeState, TimeToCollision},
};

/// Detection result for one step
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerceivedObstacle {
    /// Whether the detector reported the obstacle
    pub detected: bool,
    /// The true relative state behind the observation
    pub truth: RelativeState,
}

impl PerceivedObstacle {
    /// TTC as the controller sees it: not closing when nothing was detected
    pub fn ttc(&self) -> TimeToCollision {
        if self.detected {
            self.truth.ttc()
        } else {
            TimeToCollision::NotClosing
        }
    }
}

/// Draw one detection decision
///
/// Returns `false` for an absent obstacle. A present obstacle is missed
/// with probability `noise_rate`. `noise_rate` must lie in `[0, 1]`.
pub fn observe<R: Rng + ?Sized>(present: bool, noise_rate: f64, rng: &mut R) -> bool {
    if !present {
        return false;
    }
    // gen::<f64>() is in [0, 1): a zero rate never misses, a unit rate always does
    rng.gen::<f64>() >= noise_rate
}

/// Detector with a false-negative rate and a detection range
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Perception {
    /// Probability of missing a present obstacle
    pub noise_rate: f64,
    /// Obstacles farther than this are not present for the sensor (m)
    pub range: f64,
}

impl Default for Perception {
    fn default() -> Self {
        Self { noise_rate: 0.0, range: SENSOR_RANGE_M }
    }
}

impl Perception {
    /// Detector with the default range and the given miss rate
    pub fn new(noise_rate: f64) -> Self {
        Self { noise_rate, ..Self::default() }
    }

    /// Override the detection range
    pub fn with_range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    /// Reject rates outside `[0, 1]` and non-positive ranges
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("noise_rate", self.noise_rate, 0.0, 1.0)?;
        check_positive("perception.range", self.range)?;
        Ok(())
    }

    /// Whether the obstacle is physically within sensor reach
    pub fn in_range(&self, truth: &RelativeState) -> bool {
        truth.gap <= self.range
    }

    /// Observe the true relative state
    pub fn perceive<R: Rng + ?Sized>(&self, truth: RelativeState, rng: &mut R) -> PerceivedObstacle {
        PerceivedObstacle {
            detected: observe(self.in_range(&truth), self.noise_rate, rng),
            truth,
        }
    }
}
