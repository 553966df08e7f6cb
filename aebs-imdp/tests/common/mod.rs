//! Shared helpers for the abstraction integration tests
//!
//! - small engines on the Debug grid
//! - a concrete sampler that mirrors the abstracted dynamics point by point
//! - uniform sampling of states inside a cell

#![allow(dead_code)]

use aebs_core::{
    ControlMode, ControllerProfile, FollowingBox, FollowingState, Plant, TimeToCollision,
};
use aebs_imdp::{AbstractionConfig, AbstractionEngine, GridPreset, Imdp};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Confidence parameter for the Hoeffding tolerance
pub const HOEFFDING_DELTA: f64 = 1e-6;

/// Debug-grid config with the given perception miss rate
pub fn debug_config(noise_rate: f64) -> AbstractionConfig {
    AbstractionConfig::new(GridPreset::Debug).with_noise_rate(noise_rate)
}

/// Build and return the model for `config`
pub fn build(config: &AbstractionConfig) -> Imdp {
    AbstractionEngine::new(config)
        .expect("test config must validate")
        .build()
        .expect("abstraction must satisfy coverage")
}

/// Two-sided Hoeffding half-width for `n` Bernoulli draws
pub fn hoeffding_epsilon(n: usize) -> f64 {
    ((2.0 / HOEFFDING_DELTA).ln() / (2.0 * n as f64)).sqrt()
}

/// Uniform point inside a box
pub fn sample_in<R: Rng>(b: &FollowingBox, rng: &mut R) -> FollowingState {
    FollowingState {
        gap: rng.gen_range(b.gap.lo..=b.gap.hi),
        closing_speed: rng.gen_range(b.closing_speed.lo..=b.closing_speed.hi),
        accel: rng.gen_range(b.accel.lo..=b.accel.hi),
    }
}

/// Draws concrete successors with the same perception and noise model
/// the engine abstracts
pub struct Sampler {
    config: AbstractionConfig,
    plant: Plant,
    profile: ControllerProfile,
    noise: [Option<(Normal<f64>, f64)>; 3],
}

impl Sampler {
    pub fn new(config: &AbstractionConfig) -> Self {
        let pn = config.process_noise;
        let dim = |sigma: f64| {
            (sigma > 0.0).then(|| (Normal::new(0.0, sigma).unwrap(), 4.0 * sigma))
        };
        Self {
            config: *config,
            plant: Plant::new(config.plant),
            profile: config.profile.profile(),
            noise: [dim(pn.gap), dim(pn.speed), dim(pn.accel)],
        }
    }

    /// Command after perception: the action's own, or the fallback on a miss
    pub fn command<R: Rng>(&self, action: ControlMode, rng: &mut R) -> f64 {
        let mode = if rng.gen::<f64>() < self.config.noise_rate {
            self.profile.next_mode(action, TimeToCollision::NotClosing)
        } else {
            action
        };
        self.profile.command(mode)
    }

    /// One noisy successor of `state`
    pub fn successor<R: Rng>(&self, state: &FollowingState, action: ControlMode, rng: &mut R) -> FollowingState {
        let u = self.command(action, rng);
        let next = self.plant.step_following(state, u, self.config.dt);
        FollowingState {
            gap: next.gap + self.draw(0, rng),
            closing_speed: next.closing_speed + self.draw(1, rng),
            accel: next.accel + self.draw(2, rng),
        }
    }

    fn draw<R: Rng>(&self, dim: usize, rng: &mut R) -> f64 {
        match self.noise[dim] {
            None => 0.0,
            Some((normal, radius)) => loop {
                let w = normal.sample(rng);
                if w.abs() <= radius {
                    break w;
                }
            },
        }
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }
}
