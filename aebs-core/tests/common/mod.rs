//! Shared helpers for the simulator integration tests
//!
//! - seeded single runs and batches
//! - physical-consistency assertions over whole trajectories

#![allow(dead_code)]

use aebs_core::{
    constants::{MAX_ACCELERATION_MPS2, MAX_DECELERATION_MPS2},
    CrashStatistics, Environment, SimulationConfig, Trajectory,
};
use rand::{rngs::StdRng, SeedableRng};

/// One run from the config's own seed
pub fn run_once(config: &SimulationConfig) -> Trajectory {
    let env = Environment::try_new(config).expect("test config must validate");
    env.run(&mut StdRng::seed_from_u64(config.seed))
}

/// Batch of `runs` seeded runs
pub fn batch(config: &SimulationConfig, runs: usize) -> CrashStatistics {
    Environment::try_new(config)
        .expect("test config must validate")
        .run_batch(runs)
}

/// Every sample is finite, non-negative in speed and within the actuator limits
pub fn assert_physical(trajectory: &Trajectory) {
    for s in &trajectory.samples {
        assert!(s.gap.is_finite() && s.ego_velocity.is_finite(), "{:?}", s);
        assert!(s.ego_velocity >= 0.0 && s.lead_velocity >= 0.0, "{:?}", s);
        assert!(s.ego_acceleration >= -MAX_DECELERATION_MPS2, "{:?}", s);
        assert!(s.ego_acceleration <= MAX_ACCELERATION_MPS2, "{:?}", s);
    }
}

/// Only the terminal sample of a crashed run may have a non-positive gap
pub fn assert_crash_is_terminal(trajectory: &Trajectory) {
    let n = trajectory.samples.len();
    for s in &trajectory.samples[..n.saturating_sub(1)] {
        assert!(s.gap > 0.0, "contact before the end: {:?}", s);
    }
    if trajectory.crashed() {
        assert!(trajectory.samples[n - 1].gap <= 0.0);
    }
}
