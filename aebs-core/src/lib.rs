//! Closed-loop simulator for an Autonomous Emergency Braking System
//!
//! Models the AEBS as a stochastic hybrid system:
//! - continuous longitudinal dynamics with a first-order acceleration lag
//! - a discrete braking controller driven by time-to-collision thresholds
//! - a perception layer that can miss the obstacle (false negatives)
//!
//! The same plant and controller functions feed the grid abstraction in
//! `aebs-imdp`, so the simulated trajectories and the exported model agree
//! on the physics.
//!
//! ```no_run
//! use aebs_core::{Environment, Scenario, SimulationConfig, ProfileKind};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = SimulationConfig::new(Scenario::urban_static(), ProfileKind::Industry)
//!     .with_noise_rate(0.1);
//! config.validate()?;
//!
//! let mut rng = StdRng::seed_from_u64(config.seed);
//! let trajectory = Environment::new(&config).run(&mut rng);
//! if trajectory.crashed() {
//!     // terminal sample has gap <= 0
//! }
//! # Ok::<(), aebs_core::ConfigError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod config;
pub mod constants;
pub mod controller;
pub mod environment;
pub mod errors;
pub mod perception;
pub mod plant;
pub mod scenario;
pub mod state;

// Public API
pub use config::SimulationConfig;
pub use controller::{ControlMode, Controller, ControllerProfile, ProfileKind};
pub use environment::{CrashStatistics, Environment, Outcome, Trajectory, TrajectorySample};
pub use errors::{ConfigError, ConfigResult};
pub use perception::{PerceivedObstacle, Perception};
pub use plant::{FollowingBox, FollowingState, Interval, Plant, PlantParams};
pub use scenario::{LeadBehavior, Scenario};
pub use state::{RelativeState, TimeToCollision, VehicleState};

/// Crate version, for stamping exported artifacts
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
