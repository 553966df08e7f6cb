//! Closed-loop simulation
//!
//! ## Step order
//!
//! ```text
//! t = 0   perceive → controller update → command u₀
//! t = k   lead input → plant(ego, u_{k-1}), plant(lead) → perceive → update → u_k
//! ```
//!
//! The ego is always driven by the command issued in the previous cycle,
//! which is the one-step sensing-to-actuation delay of a real ECU.
//!
//! ## Termination
//!
//! - gap ≤ 0: [`Outcome::Crashed`]
//! - both vehicles below the standstill speed (when enabled): [`Outcome::Standstill`]
//! - step budget used up: [`Outcome::HorizonReached`]
//!
//! A crash is a result, not an error. Randomness is drawn only from the
//! generator passed to [`Environment::run`], in a fixed order (lead input,
//! then perception), so a seed reproduces a run.

use rand::{rngs::StdRng, Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    config::SimulationConfig,
    constants::STANDSTILL_SPEED_MPS,
    controller::{ControlMode, Controller},
    errors::ConfigResult,
    perception::{PerceivedObstacle, Perception},
    plant::Plant,
    state::{RelativeState, TimeToCollision, VehicleState},
};

/// One recorded instant of a run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectorySample {
    /// Simulation time (s)
    pub time: f64,
    /// True gap (m)
    pub gap: f64,
    /// Ego speed (m/s)
    pub ego_velocity: f64,
    /// Lead speed (m/s)
    pub lead_velocity: f64,
    /// Ego acceleration after the lag (m/s²)
    pub ego_acceleration: f64,
    /// Controller mode after this step's update
    pub mode: ControlMode,
    /// Whether perception reported the obstacle
    pub detected: bool,
    /// TTC the controller acted on
    pub ttc: TimeToCollision,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Outcome {
    /// Gap reached zero
    Crashed {
        /// Step at which contact was detected
        step: usize,
        /// Time of that step (s)
        time: f64,
    },
    /// Both vehicles came to rest without contact
    Standstill {
        /// Step at which both were stopped
        step: usize,
        /// Time of that step (s)
        time: f64,
    },
    /// Step budget used up without contact
    HorizonReached,
}

/// Ordered samples of one run plus its outcome
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Trajectory {
    /// Samples in time order, starting at t = 0
    pub samples: Vec<TrajectorySample>,
    /// Termination reason
    pub outcome: Outcome,
}

impl Trajectory {
    /// The run ended in contact
    pub fn crashed(&self) -> bool {
        matches!(self.outcome, Outcome::Crashed { .. })
    }

    /// Last recorded sample
    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    /// Smallest gap seen during the run
    pub fn min_gap(&self) -> f64 {
        self.samples.iter().map(|s| s.gap).fold(f64::INFINITY, f64::min)
    }

    /// Most urgent mode the controller reached
    pub fn max_mode(&self) -> ControlMode {
        self.samples.iter().map(|s| s.mode).max().unwrap_or_default()
    }
}

/// Crash count over a batch of runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CrashStatistics {
    /// Runs performed
    pub runs: usize,
    /// Runs that ended in contact
    pub crashes: usize,
}

impl CrashStatistics {
    /// Fraction of runs that crashed (0 for an empty batch)
    pub fn crash_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.crashes as f64 / self.runs as f64
        }
    }

    /// Record one run
    pub fn record(&mut self, trajectory: &Trajectory) {
        self.runs += 1;
        if trajectory.crashed() {
            self.crashes += 1;
        }
    }
}

/// Plant, perception and controller wired together for one configuration
#[derive(Debug, Clone)]
pub struct Environment {
    config: SimulationConfig,
    plant: Plant,
    perception: Perception,
}

impl Environment {
    /// Environment for `config`, assumed already validated
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            config: *config,
            plant: Plant::new(config.plant),
            perception: config.perception(),
        }
    }

    /// Validate `config`, then build the environment
    pub fn try_new(config: &SimulationConfig) -> ConfigResult<Self> {
        config.validate().map_err(|e| {
            log_warn!("rejected simulation config: {}", e);
            e
        })?;
        Ok(Self::new(config))
    }

    /// Configuration in use
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulate one run
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Trajectory {
        let cfg = &self.config;
        let dt = cfg.dt;
        let scenario = &cfg.scenario;

        let mut ego = scenario.initial_ego();
        let mut lead = scenario.initial_lead();
        let mut controller = Controller::new(cfg.controller_profile());

        let mut samples = Vec::with_capacity(cfg.horizon_steps + 1);
        let observation = self.perception.perceive(RelativeState::between(&ego, &lead), rng);
        let mut command = controller.update(&observation);
        samples.push(sample(0.0, &ego, &lead, &controller, &observation));

        let mut outcome = Outcome::HorizonReached;
        for step in 1..=cfg.horizon_steps {
            let time = step as f64 * dt;

            let lead_input = scenario.lead_command(rng);
            lead = self.plant.step(&lead, lead_input, dt);
            ego = self.plant.step(&ego, command, dt);

            let truth = RelativeState::between(&ego, &lead);
            let observation = self.perception.perceive(truth, rng);
            command = controller.update(&observation);
            samples.push(sample(time, &ego, &lead, &controller, &observation));

            if truth.is_collision() {
                outcome = Outcome::Crashed { step, time };
                break;
            }
            if cfg.stop_at_standstill
                && ego.velocity < STANDSTILL_SPEED_MPS
                && lead.velocity < STANDSTILL_SPEED_MPS
            {
                outcome = Outcome::Standstill { step, time };
                break;
            }
        }

        log_debug!("run finished: {:?} after {} samples", outcome, samples.len());
        Trajectory { samples, outcome }
    }

    /// Run `runs` independent simulations seeded `seed, seed + 1, …`
    pub fn run_batch(&self, runs: usize) -> CrashStatistics {
        let mut stats = CrashStatistics::default();
        for i in 0..runs {
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
            stats.record(&self.run(&mut rng));
        }
        log_info!(
            "{:?} profile, noise {}: {}/{} crashes",
            self.config.profile,
            self.config.noise_rate,
            stats.crashes,
            stats.runs
        );
        stats
    }
}

fn sample(
    time: f64,
    ego: &VehicleState,
    lead: &VehicleState,
    controller: &Controller,
    observation: &PerceivedObstacle,
) -> TrajectorySample {
    TrajectorySample {
        time,
        gap: lead.position - ego.position,
        ego_velocity: ego.velocity,
        lead_velocity: lead.velocity,
        ego_acceleration: ego.acceleration,
        mode: controller.mode(),
        detected: observation.detected,
        ttc: observation.ttc(),
    }
}
