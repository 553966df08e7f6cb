//! Simulation configuration
//!
//! `SimulationConfig` gathers everything a closed-loop run needs. Build it
//! with [`SimulationConfig::new`] and the `with_*` setters, or load it from
//! JSON with [`SimulationConfig::from_json`] (serde feature). Missing JSON
//! fields take their defaults:
//!
//! ```json
//! {
//!   "scenario": {
//!     "initial_gap": 40.0, "ego_velocity": 25.0, "lead_velocity": 0.0,
//!     "lead_behavior": "Static", "lead_accel_bound": 2.0
//!   },
//!   "profile": "Safe",
//!   "noise_rate": 0.5,
//!   "seed": 7
//! }
//! ```
//!
//! Nothing is checked at construction. Call [`SimulationConfig::validate`]
//! (or use `Environment::try_new`) before running.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_DT_S, DEFAULT_HORIZON_STEPS, SENSOR_RANGE_M},
    controller::{ControllerProfile, ProfileKind},
    errors::{check_positive, ConfigError, ConfigResult},
    perception::Perception,
    plant::PlantParams,
    scenario::Scenario,
};

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 42;

/// Parameters of one closed-loop simulation
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Initial conditions and lead policy
    pub scenario: Scenario,
    /// Controller calibration
    pub profile: ProfileKind,
    /// Probability of missing a present obstacle, in `[0, 1]`
    pub noise_rate: f64,
    /// Detection range (m)
    pub sensor_range: f64,
    /// Integration and control step (s)
    pub dt: f64,
    /// Step budget per run
    pub horizon_steps: usize,
    /// Seed of the first run; batch run `i` uses `seed + i`
    pub seed: u64,
    /// End the run once both vehicles are stopped
    pub stop_at_standstill: bool,
    /// Plant calibration
    pub plant: PlantParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new(Scenario::default(), ProfileKind::Industry)
    }
}

impl SimulationConfig {
    /// Noise-free configuration with default step, horizon and seed
    pub fn new(scenario: Scenario, profile: ProfileKind) -> Self {
        Self {
            scenario,
            profile,
            noise_rate: 0.0,
            sensor_range: SENSOR_RANGE_M,
            dt: DEFAULT_DT_S,
            horizon_steps: DEFAULT_HORIZON_STEPS,
            seed: DEFAULT_SEED,
            stop_at_standstill: true,
            plant: PlantParams::default(),
        }
    }

    /// Set the false-negative rate
    pub fn with_noise_rate(mut self, noise_rate: f64) -> Self {
        self.noise_rate = noise_rate;
        self
    }

    /// Set the detection range
    pub fn with_sensor_range(mut self, range: f64) -> Self {
        self.sensor_range = range;
        self
    }

    /// Set the step size
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    /// Set the step budget
    pub fn with_horizon(mut self, steps: usize) -> Self {
        self.horizon_steps = steps;
        self
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Keep running after both vehicles have stopped
    pub fn without_standstill_stop(mut self) -> Self {
        self.stop_at_standstill = false;
        self
    }

    /// Set the plant calibration
    pub fn with_plant(mut self, plant: PlantParams) -> Self {
        self.plant = plant;
        self
    }

    /// Calibration data of the selected profile
    pub fn controller_profile(&self) -> ControllerProfile {
        self.profile.profile()
    }

    /// Perception model described by this configuration
    pub fn perception(&self) -> Perception {
        Perception::new(self.noise_rate).with_range(self.sensor_range)
    }

    /// Check every field; the first violation wins
    pub fn validate(&self) -> ConfigResult<()> {
        self.scenario.validate()?;
        self.controller_profile().validate()?;
        self.perception().validate()?;
        check_positive("dt", self.dt)?;
        if self.horizon_steps == 0 {
            return Err(ConfigError::ZeroCount { field: "horizon_steps" });
        }
        self.plant.validate()?;
        Ok(())
    }

    /// Decode from JSON and validate
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
            reason: json_error_reason(&e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Encode as pretty-printed JSON
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Malformed {
            reason: json_error_reason(&e),
        })
    }
}

/// Short reason for a serde_json failure, by error category
#[cfg(feature = "serde")]
pub fn json_error_reason(e: &serde_json::Error) -> &'static str {
    use serde_json::error::Category;
    match e.classify() {
        Category::Io => "i/o error",
        Category::Syntax => "invalid JSON syntax",
        Category::Data => "field has the wrong type or value",
        Category::Eof => "unexpected end of input",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::LeadBehavior;

    #[test]
    fn defaults_validate() {
        assert!(SimulationConfig::default().validate().is_ok());
        let config = SimulationConfig::new(Scenario::highway_traffic(), ProfileKind::Safe)
            .with_noise_rate(0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let base = SimulationConfig::default();

        assert!(matches!(
            base.with_noise_rate(-0.2).validate(),
            Err(ConfigError::OutOfRange { field: "noise_rate", .. })
        ));
        assert!(matches!(
            base.with_dt(0.0).validate(),
            Err(ConfigError::NonPositive { field: "dt", .. })
        ));
        assert_eq!(
            base.with_horizon(0).validate(),
            Err(ConfigError::ZeroCount { field: "horizon_steps" })
        );

        let backwards = Scenario::custom(20.0, -5.0, LeadBehavior::Static, 0.0);
        assert!(matches!(
            SimulationConfig::new(backwards, ProfileKind::Industry).validate(),
            Err(ConfigError::Negative { field: "scenario.ego_velocity", .. })
        ));
    }

    #[test]
    fn perception_follows_config() {
        let config = SimulationConfig::default().with_noise_rate(0.25).with_sensor_range(60.0);
        let p = config.perception();
        assert_eq!(p.noise_rate, 0.25);
        assert_eq!(p.range, 60.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_fills_missing_fields() {
        let config = SimulationConfig::from_json(r#"{ "profile": "Safe", "noise_rate": 0.3 }"#)
            .unwrap();
        assert_eq!(config.profile, ProfileKind::Safe);
        assert_eq!(config.noise_rate, 0.3);
        assert_eq!(config.dt, DEFAULT_DT_S);
        assert_eq!(config.scenario, Scenario::urban_static());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        let config = SimulationConfig::new(Scenario::highway_cutout(), ProfileKind::Safe)
            .with_seed(9)
            .with_noise_rate(0.5);
        let json = config.to_json().unwrap();
        assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_errors_are_reported() {
        assert!(matches!(
            SimulationConfig::from_json("{ not json"),
            Err(ConfigError::Malformed { .. })
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "noise_rate": 2.0 }"#),
            Err(ConfigError::OutOfRange { .. })
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "profile": "Aggressive" }"#),
            Err(ConfigError::Malformed { .. })
        ));
    }
}
