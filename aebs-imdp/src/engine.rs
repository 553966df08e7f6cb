//! Abstraction engine
//!
//! Builds the IMDP cell by cell. For a source cell and an action (a braking
//! mode):
//!
//! 1. **Perception branches.** With weight `1 - p` the obstacle is seen and
//!    the mode's deceleration is applied. With weight `p` it is missed and the
//!    controller falls back to `next_mode(mode, NotClosing)`. Branches with
//!    the same command are merged.
//! 2. **Plant image.** `Plant::step_following_box` encloses the one-step
//!    image of the whole cell under the branch command.
//! 3. **Successor bounds.** Per dimension, [`Kernel::bounds`] bounds the
//!    probability of each target bin over the image; cell bounds are the
//!    products, Crash is `gap ≤ 0`, Escape is `gap > max` or
//!    `gap inside ∧ speed ≥ max`.
//! 4. **Mixing.** Branch bounds are weighted and summed, then widened by
//!    the rounding margin.
//!
//! No sampling is involved: every interval holds for every concrete state
//! in the cell. Rows are independent and land in disjoint slots; the
//! `parallel` feature spreads them over rayon's pool.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use aebs_core::config::json_error_reason;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use aebs_core::{
    constants::DEFAULT_DT_S,
    errors::{check_finite, check_positive, check_range, ConfigError, ConfigResult},
    ControlMode, ControllerProfile, FollowingBox, FollowingState, Plant, PlantParams, ProfileKind,
    TimeToCollision,
};

use crate::{
    errors::AbstractionResult,
    grid::{Axis, Grid, GridConfig, GridPreset, Successor},
    imdp::{check_row, Imdp, IntervalTransition},
    kernel::{Bounds, Kernel, ProcessNoise},
};

/// Initial state of the default model: Highway Cut-Out (40 m, 25 m/s)
pub const DEFAULT_INITIAL_STATE: FollowingState = FollowingState {
    gap: 40.0,
    closing_speed: 25.0,
    accel: 0.0,
};

/// Parameters of one abstraction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AbstractionConfig {
    /// Envelope and resolution
    pub grid: GridConfig,
    /// Controller calibration supplying the per-mode decelerations
    pub profile: ProfileKind,
    /// Perception false-negative rate
    pub noise_rate: f64,
    /// Control step (s)
    pub dt: f64,
    /// Additive process noise; all-zero disables it
    pub process_noise: ProcessNoise,
    /// Plant calibration
    pub plant: PlantParams,
    /// State marked as initial in the exported model
    pub initial_state: FollowingState,
}

impl Default for AbstractionConfig {
    fn default() -> Self {
        Self::new(GridPreset::Coarse)
    }
}

impl AbstractionConfig {
    /// Industry profile, no noise, default envelope at a preset resolution
    pub fn new(preset: GridPreset) -> Self {
        Self {
            grid: GridConfig::preset(preset),
            profile: ProfileKind::Industry,
            noise_rate: 0.0,
            dt: DEFAULT_DT_S,
            process_noise: ProcessNoise::default(),
            plant: PlantParams::default(),
            initial_state: DEFAULT_INITIAL_STATE,
        }
    }

    /// Set the controller profile
    pub fn with_profile(mut self, profile: ProfileKind) -> Self {
        self.profile = profile;
        self
    }

    /// Set the perception false-negative rate
    pub fn with_noise_rate(mut self, noise_rate: f64) -> Self {
        self.noise_rate = noise_rate;
        self
    }

    /// Set the process noise
    pub fn with_process_noise(mut self, noise: ProcessNoise) -> Self {
        self.process_noise = noise;
        self
    }

    /// Replace the grid
    pub fn with_grid(mut self, grid: GridConfig) -> Self {
        self.grid = grid;
        self
    }

    /// Set the initial state
    pub fn with_initial_state(mut self, state: FollowingState) -> Self {
        self.initial_state = state;
        self
    }

    /// Check every field, including that the initial state lies in a cell
    pub fn validate(&self) -> ConfigResult<()> {
        self.plant.validate()?;
        self.grid.validate(&self.plant)?;
        self.profile.profile().validate()?;
        check_range("noise_rate", self.noise_rate, 0.0, 1.0)?;
        check_positive("dt", self.dt)?;
        self.process_noise.validate()?;

        let s = &self.initial_state;
        check_finite("initial_state.accel", s.accel)?;
        let gap = check_finite("initial_state.gap", s.gap)?;
        if gap <= 0.0 || gap > self.grid.gap.hi {
            return Err(ConfigError::OutOfRange {
                field: "initial_state.gap",
                value: gap,
                min: 0.0,
                max: self.grid.gap.hi,
            });
        }
        let speed = check_finite("initial_state.closing_speed", s.closing_speed)?;
        if speed < 0.0 || speed >= self.grid.speed.hi {
            return Err(ConfigError::OutOfRange {
                field: "initial_state.closing_speed",
                value: speed,
                min: 0.0,
                max: self.grid.speed.hi,
            });
        }
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
}

/// One perception outcome and the command it leads to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Branch {
    /// Probability of this outcome
    pub weight: f64,
    /// Acceleration command applied (m/s²)
    pub command: f64,
}

/// Per-dimension bin bounds for one branch image
struct DimensionBounds {
    crash: Bounds,
    escape: Bounds,
    gap: Vec<(usize, Bounds)>,
    speed: Vec<(usize, Bounds)>,
    accel: Vec<(usize, Bounds)>,
}

/// Computes interval transitions from the plant and controller model
#[derive(Debug, Clone)]
pub struct AbstractionEngine {
    config: AbstractionConfig,
    grid: Grid,
    plant: Plant,
    profile: ControllerProfile,
    kernels: [Kernel; 3],
}

impl AbstractionEngine {
    /// Validate `config` and prepare the grid and kernels
    pub fn new(config: &AbstractionConfig) -> AbstractionResult<Self> {
        config.validate()?;
        Ok(Self {
            config: *config,
            grid: Grid::new(&config.grid, &config.plant)?,
            plant: Plant::new(config.plant),
            profile: config.profile.profile(),
            kernels: config.process_noise.kernels(),
        })
    }

    /// The state partition
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Actions in row order
    pub fn actions(&self) -> &'static [ControlMode] {
        &ControlMode::ALL
    }

    /// Perception branches of `action`, equal commands merged
    pub fn branches(&self, action: ControlMode) -> heapless::Vec<Branch, 2> {
        let p = self.config.noise_rate;
        let seen = self.profile.command(action);
        let missed = self
            .profile
            .command(self.profile.next_mode(action, TimeToCollision::NotClosing));

        let mut branches = heapless::Vec::new();
        if seen == missed || p == 0.0 {
            let _ = branches.push(Branch { weight: 1.0, command: seen });
        } else if p == 1.0 {
            let _ = branches.push(Branch { weight: 1.0, command: missed });
        } else {
            let _ = branches.push(Branch { weight: 1.0 - p, command: seen });
            let _ = branches.push(Branch { weight: p, command: missed });
        }
        branches
    }

    /// Interval transitions of flat cell `cell` under `action`
    pub fn transitions(&self, cell: usize, action: ControlMode) -> Vec<IntervalTransition> {
        let source = self.grid.cell_box(self.grid.cell(cell));
        let mut mixed: BTreeMap<Successor, Bounds> = BTreeMap::new();

        for branch in self.branches(action) {
            let image = self.plant.step_following_box(&source, branch.command, self.config.dt);
            for (target, bounds) in self.image_bounds(&image) {
                let entry = mixed.entry(target).or_insert(Bounds::ZERO);
                *entry = entry.sum(bounds.scaled(branch.weight));
            }
        }

        mixed
            .into_iter()
            .map(|(target, b)| (target, b.widened()))
            .filter(|(_, b)| !b.is_impossible())
            .map(|(target, b)| IntervalTransition { target, lower: b.lower, upper: b.upper })
            .collect()
    }

    /// Successor bounds for one deterministic image box
    fn image_bounds(&self, image: &FollowingBox) -> Vec<(Successor, Bounds)> {
        let dims = self.dimension_bounds(image);
        let mut out = Vec::with_capacity(2 + dims.gap.len() * dims.speed.len() * dims.accel.len());

        if !dims.crash.is_impossible() {
            out.push((Successor::Crash, dims.crash));
        }
        if !dims.escape.is_impossible() {
            out.push((Successor::Escape, dims.escape));
        }

        let (_, n_speed, n_accel) = self.grid.dims();
        for &(g, bg) in &dims.gap {
            for &(v, bv) in &dims.speed {
                let gv = bg.product(bv);
                if gv.is_impossible() {
                    continue;
                }
                for &(a, ba) in &dims.accel {
                    let b = gv.product(ba);
                    if !b.is_impossible() {
                        let flat = (g * n_speed + v) * n_accel + a;
                        out.push((Successor::Cell(flat as u32), b));
                    }
                }
            }
        }
        out
    }

    fn dimension_bounds(&self, image: &FollowingBox) -> DimensionBounds {
        let [kg, kv, ka] = self.kernels;
        let (gap_axis, speed_axis, accel_axis) =
            (self.grid.gap_axis(), self.grid.speed_axis(), self.grid.accel_axis());
        let (g_max, v_max) = (gap_axis.hi(), speed_axis.hi());

        let crash = kg.bounds(image.gap, f64::NEG_INFINITY, 0.0);
        let gap_inside = kg.bounds(image.gap, 0.0, g_max);
        let gap_beyond = kg.bounds(image.gap, g_max, f64::INFINITY);
        let speed_beyond = kv.bounds(image.closing_speed, v_max, f64::INFINITY);
        let escape = gap_beyond.sum(gap_inside.product(speed_beyond));

        DimensionBounds {
            crash,
            escape,
            gap: bin_bounds(&kg, gap_axis, image.gap, false, false),
            speed: bin_bounds(&kv, speed_axis, image.closing_speed, true, false),
            accel: bin_bounds(&ka, accel_axis, image.accel, true, true),
        }
    }

    /// Compute every row and check coverage
    pub fn build(&self) -> AbstractionResult<Imdp> {
        let actions = self.actions();
        let (n_gap, n_speed, n_accel) = self.grid.dims();
        let per_slice = n_speed * n_accel * actions.len();

        log_info!(
            "building IMDP: {} cells x {} actions ({:?}, noise {})",
            self.grid.num_cells(),
            actions.len(),
            self.config.profile,
            self.config.noise_rate
        );

        let mut rows: Vec<Vec<IntervalTransition>> = Vec::with_capacity(n_gap * per_slice);
        let mut reported = 0;
        for g in 0..n_gap {
            let slice = g * per_slice..(g + 1) * per_slice;
            rows.extend(self.compute_rows(slice));

            let percent = (g + 1) * 100 / n_gap;
            if percent >= reported + 10 {
                reported = percent - percent % 10;
                log_debug!("abstraction {}% ({} of {} gap slices)", reported, g + 1, n_gap);
            }
        }

        let n_actions = actions.len();
        for (r, row) in rows.iter().enumerate() {
            check_row(r / n_actions, actions[r % n_actions], row)?;
        }

        let initial = match self.grid.locate(&self.config.initial_state) {
            Successor::Cell(i) => self.grid.cell(i as usize),
            other => {
                log_warn!("initial state lands in {}, marking cell 0 as initial", other);
                self.grid.cell(0)
            }
        };
        let imdp = Imdp::new(self.config, self.grid, actions.to_vec(), initial, rows)?;
        log_info!("IMDP built: {} transitions", imdp.num_transitions());
        Ok(imdp)
    }

    #[cfg(feature = "parallel")]
    fn compute_rows(&self, rows: core::ops::Range<usize>) -> Vec<Vec<IntervalTransition>> {
        let n = self.actions().len();
        rows.into_par_iter()
            .map(|r| self.transitions(r / n, ControlMode::ALL[r % n]))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_rows(&self, rows: core::ops::Range<usize>) -> Vec<Vec<IntervalTransition>> {
        let n = self.actions().len();
        rows.map(|r| self.transitions(r / n, ControlMode::ALL[r % n])).collect()
    }
}

/// Bounds for every bin of `axis` the noisy image can reach
///
/// `open_below`/`open_above` extend the first/last bin to infinity (clamped
/// axes). Gap bins are never extended: below is Crash, above is Escape.
fn bin_bounds(
    kernel: &Kernel,
    axis: &Axis,
    mean: aebs_core::Interval,
    open_below: bool,
    open_above: bool,
) -> Vec<(usize, Bounds)> {
    let last = axis.len() - 1;
    let (first, end) = axis.overlapping(kernel.support(mean));
    (first..=end)
        .filter_map(|i| {
            let l = if open_below && i == 0 { f64::NEG_INFINITY } else { axis.edge(i) };
            let h = if open_above && i == last { f64::INFINITY } else { axis.edge(i + 1) };
            let b = kernel.bounds(mean, l, h);
            (!b.is_impossible()).then_some((i, b))
        })
        .collect()
}
