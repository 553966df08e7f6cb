//! Test scenarios and lead-vehicle behavior
//!
//! A scenario fixes the initial conditions (ego speed, gap, lead speed) and
//! the policy that drives the lead vehicle. The named presets follow the
//! Euro NCAP AEB City and Inter-Urban setups; a cut-out is modeled as the
//! moment the vehicle in front swerves away and reveals a stopped obstacle
//! at short range.

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::scenarios::*,
    errors::{check_non_negative, check_positive, ConfigResult},
    state::VehicleState,
};

/// How the lead vehicle moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LeadBehavior {
    /// Stopped obstacle, velocity 0
    Static,
    /// Constant velocity, zero input
    Steady,
    /// Uniformly random acceleration input each step
    Unpredictable,
}

/// Initial conditions plus lead policy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scenario {
    /// Distance from ego to lead at t = 0 (m)
    pub initial_gap: f64,
    /// Ego speed at t = 0 (m/s)
    pub ego_velocity: f64,
    /// Lead speed at t = 0 (m/s); ignored for a static lead
    pub lead_velocity: f64,
    /// Lead policy
    pub lead_behavior: LeadBehavior,
    /// Bound on the unpredictable lead's input (m/s²)
    pub lead_accel_bound: f64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::urban_static()
    }
}

impl Scenario {
    /// Named presets, in the order they are listed to users
    pub const PRESET_NAMES: [&'static str; 5] = [
        "urban_static",
        "urban_cutout",
        "highway_static",
        "highway_cutout",
        "highway_traffic",
    ];

    /// Arbitrary scenario with the default lead acceleration bound
    pub fn custom(
        initial_gap: f64,
        ego_velocity: f64,
        lead_behavior: LeadBehavior,
        lead_velocity: f64,
    ) -> Self {
        Self {
            initial_gap,
            ego_velocity,
            lead_velocity,
            lead_behavior,
            lead_accel_bound: DEFAULT_LEAD_ACCEL_BOUND_MPS2,
        }
    }

    /// Stopped obstacle, city speed, ample gap
    pub fn urban_static() -> Self {
        Self::custom(URBAN_STATIC_GAP_M, URBAN_EGO_SPEED_MPS, LeadBehavior::Static, 0.0)
    }

    /// Stopped obstacle revealed late at city speed
    pub fn urban_cutout() -> Self {
        Self::custom(URBAN_CUTOUT_GAP_M, URBAN_EGO_SPEED_MPS, LeadBehavior::Static, 0.0)
    }

    /// Stopped obstacle at long range, highway speed
    pub fn highway_static() -> Self {
        Self::custom(HIGHWAY_STATIC_GAP_M, HIGHWAY_EGO_SPEED_MPS, LeadBehavior::Static, 0.0)
    }

    /// Stopped obstacle revealed late at highway speed
    pub fn highway_cutout() -> Self {
        Self::custom(HIGHWAY_CUTOUT_GAP_M, HIGHWAY_EGO_SPEED_MPS, LeadBehavior::Static, 0.0)
    }

    /// Following a lead that brakes and accelerates at random
    pub fn highway_traffic() -> Self {
        Self::custom(
            HIGHWAY_TRAFFIC_GAP_M,
            HIGHWAY_EGO_SPEED_MPS,
            LeadBehavior::Unpredictable,
            HIGHWAY_TRAFFIC_LEAD_SPEED_MPS,
        )
    }

    /// Look a preset up by its name in [`Scenario::PRESET_NAMES`]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "urban_static" => Some(Self::urban_static()),
            "urban_cutout" => Some(Self::urban_cutout()),
            "highway_static" => Some(Self::highway_static()),
            "highway_cutout" => Some(Self::highway_cutout()),
            "highway_traffic" => Some(Self::highway_traffic()),
            _ => None,
        }
    }

    /// Override the initial gap
    pub fn with_gap(mut self, initial_gap: f64) -> Self {
        self.initial_gap = initial_gap;
        self
    }

    /// Override the unpredictable lead's input bound
    pub fn with_lead_accel_bound(mut self, bound: f64) -> Self {
        self.lead_accel_bound = bound;
        self
    }

    /// Reject non-positive gaps, negative speeds and negative bounds
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("scenario.initial_gap", self.initial_gap)?;
        check_non_negative("scenario.ego_velocity", self.ego_velocity)?;
        check_non_negative("scenario.lead_velocity", self.lead_velocity)?;
        check_non_negative("scenario.lead_accel_bound", self.lead_accel_bound)?;
        Ok(())
    }

    /// Ego state at t = 0, at the origin
    pub fn initial_ego(&self) -> VehicleState {
        VehicleState::cruising(0.0, self.ego_velocity)
    }

    /// Lead state at t = 0, `initial_gap` ahead of the ego
    pub fn initial_lead(&self) -> VehicleState {
        let velocity = match self.lead_behavior {
            LeadBehavior::Static => 0.0,
            LeadBehavior::Steady | LeadBehavior::Unpredictable => self.lead_velocity,
        };
        VehicleState::cruising(self.initial_gap, velocity)
    }

    /// Lead acceleration input for one step
    ///
    /// Only the unpredictable lead consumes randomness.
    pub fn lead_command<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self.lead_behavior {
            LeadBehavior::Static | LeadBehavior::Steady => 0.0,
            LeadBehavior::Unpredictable if self.lead_accel_bound > 0.0 => {
                rng.gen_range(-self.lead_accel_bound..=self.lead_accel_bound)
            }
            LeadBehavior::Unpredictable => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn presets_are_valid_and_named() {
        for name in Scenario::PRESET_NAMES {
            let scenario = Scenario::preset(name).unwrap();
            assert!(scenario.validate().is_ok(), "{}", name);
        }
        assert!(Scenario::preset("rural").is_none());
    }

    #[test]
    fn highway_cutout_initial_conditions() {
        let s = Scenario::highway_cutout();
        assert_eq!(s.initial_ego().velocity, 25.0);
        assert_eq!(s.initial_lead().position, 40.0);
        assert_eq!(s.initial_lead().velocity, 0.0);
    }

    #[test]
    fn static_lead_ignores_lead_velocity() {
        let s = Scenario::custom(30.0, 10.0, LeadBehavior::Static, 8.0);
        assert_eq!(s.initial_lead().velocity, 0.0);

        let s = Scenario::custom(30.0, 10.0, LeadBehavior::Steady, 8.0);
        assert_eq!(s.initial_lead().velocity, 8.0);
    }

    #[test]
    fn unpredictable_lead_stays_within_bound() {
        let s = Scenario::highway_traffic().with_lead_accel_bound(1.5);
        let mut rng = StdRng::seed_from_u64(3);
        let inputs: Vec<f64> = (0..500).map(|_| s.lead_command(&mut rng)).collect();

        assert!(inputs.iter().all(|u| u.abs() <= 1.5));
        assert!(inputs.iter().any(|u| *u > 0.5));
        assert!(inputs.iter().any(|u| *u < -0.5));
    }

    #[test]
    fn deterministic_leads_have_zero_input() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(Scenario::urban_static().lead_command(&mut rng), 0.0);
        let steady = Scenario::custom(40.0, 25.0, LeadBehavior::Steady, 20.0);
        assert_eq!(steady.lead_command(&mut rng), 0.0);
    }

    #[test]
    fn invalid_scenarios_rejected() {
        assert!(Scenario::urban_static().with_gap(0.0).validate().is_err());
        assert!(Scenario::custom(10.0, -1.0, LeadBehavior::Static, 0.0).validate().is_err());
        assert!(Scenario::highway_traffic()
            .with_lead_accel_bound(f64::NAN)
            .validate()
            .is_err());
    }
}
