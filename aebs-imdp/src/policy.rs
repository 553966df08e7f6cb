//! Closed-loop controller as an IMDP scheduler constraint
//!
//! The IMDP leaves the braking mode nondeterministic. This policy narrows
//! it, per cell, to the modes the TTC controller can actually be in there.
//! The mode depends on history (one-level escalation, hysteresis on the
//! way down), so thresholds alone are not enough. The sets are the least
//! fixpoint of
//!
//! ```text
//! seed:  (c, m)  for m ∈ next_mode(Nominal, TTC(c))
//! step:  (c, m) ∧ c' ∈ succ(c, m)  ⇒  (c', m')  for m' ∈ next_mode(m, TTC(c'))
//! ```
//!
//! where `succ` is the row support of the IMDP and `TTC(c)` ranges over
//!
//! ```text
//! [ g_lo / v_hi , g_hi / v_lo ]      (v_lo = 0 ⇒ not closing)
//! ```
//!
//! `next_mode` is monotone in TTC, so the modes for a TTC range are the
//! contiguous span between its two ends. A missed detection, possible when
//! the miss rate is positive or the cell lies beyond sensor range, adds
//! `next_mode(m, NotClosing)`. Every run that starts in the envelope with
//! the controller in Nominal stays inside the sets. The policy ignores
//! acceleration in the exported formulas, so per-cell sets are merged per
//! (gap, speed) column.

use std::collections::VecDeque;

use aebs_core::{constants::SENSOR_RANGE_M, ControlMode, ControllerProfile, TimeToCollision};

use crate::{
    grid::{CellIndex, Grid, Successor},
    imdp::Imdp,
};

/// Small set of modes, one bit per urgency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ModeSet(u8);

impl ModeSet {
    /// No mode
    pub const EMPTY: ModeSet = ModeSet(0);

    /// Every mode from `lo` to `hi`, inclusive
    pub fn range(lo: ControlMode, hi: ControlMode) -> Self {
        let mut set = Self::EMPTY;
        for mode in ControlMode::ALL {
            if lo <= mode && mode <= hi {
                set.insert(mode);
            }
        }
        set
    }

    /// Add a mode; true when it was not there yet
    pub fn insert(&mut self, mode: ControlMode) -> bool {
        let added = !self.contains(mode);
        self.0 |= 1 << mode.level();
        added
    }

    /// Membership
    pub fn contains(&self, mode: ControlMode) -> bool {
        self.0 & (1 << mode.level()) != 0
    }

    /// Modes in either set
    pub fn union(self, other: ModeSet) -> ModeSet {
        ModeSet(self.0 | other.0)
    }

    /// Number of modes
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// No mode at all
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in increasing urgency
    pub fn iter(self) -> impl Iterator<Item = ControlMode> {
        ControlMode::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

/// TTC range and visibility of one (gap, speed) column
#[derive(Clone, Copy)]
struct Column {
    nearest: TimeToCollision,
    farthest: TimeToCollision,
    blind: bool,
}

/// Mode updates the controller can make on entering a column
struct ModeUpdates {
    profile: ControllerProfile,
    columns: Vec<Column>,
    missable: bool,
}

impl ModeUpdates {
    fn new(grid: &Grid, profile: ControllerProfile, missable: bool) -> Self {
        let (n_gap, n_speed, _) = grid.dims();
        let mut columns = Vec::with_capacity(n_gap * n_speed);
        for g in 0..n_gap {
            let gap = grid.gap_axis().bin(g);
            for v in 0..n_speed {
                let speed = grid.speed_axis().bin(v);
                columns.push(Column {
                    nearest: TimeToCollision::from_gap(gap.lo, speed.hi),
                    farthest: TimeToCollision::from_gap(gap.hi, speed.lo),
                    blind: gap.hi > SENSOR_RANGE_M,
                });
            }
        }
        Self { profile, columns, missable }
    }

    /// Modes `next_mode(mode, ·)` returns for some observation in `column`
    fn after(&self, mode: ControlMode, column: usize) -> ModeSet {
        let c = self.columns[column];
        let mut set = ModeSet::range(
            self.profile.next_mode(mode, c.farthest),
            self.profile.next_mode(mode, c.nearest),
        );
        if self.missable || c.blind {
            set.insert(self.profile.next_mode(mode, TimeToCollision::NotClosing));
        }
        set
    }
}

/// Modes the controller may be in, per (gap, speed) column
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerPolicy {
    speed_bins: usize,
    columns: Vec<ModeSet>,
}

impl ControllerPolicy {
    /// Reachable controller modes over the model's grid and successors
    pub fn closed_loop(imdp: &Imdp) -> Self {
        let grid = imdp.grid();
        let config = imdp.config();
        let updates = ModeUpdates::new(grid, config.profile.profile(), config.noise_rate > 0.0);
        let (_, n_speed, n_accel) = grid.dims();

        let mut modes = vec![ModeSet::EMPTY; grid.num_cells()];
        let mut queue = VecDeque::new();
        for (cell, set) in modes.iter_mut().enumerate() {
            for mode in updates.after(ControlMode::Nominal, cell / n_accel).iter() {
                if set.insert(mode) {
                    queue.push_back((cell, mode));
                }
            }
        }

        while let Some((cell, mode)) = queue.pop_front() {
            for t in imdp.transitions(cell, mode) {
                let Successor::Cell(next) = t.target else { continue };
                let next = next as usize;
                for m in updates.after(mode, next / n_accel).iter() {
                    if modes[next].insert(m) {
                        queue.push_back((next, m));
                    }
                }
            }
        }

        let columns: Vec<ModeSet> = modes
            .chunks(n_accel)
            .map(|cells| cells.iter().fold(ModeSet::EMPTY, |acc, set| acc.union(*set)))
            .collect();
        log_debug!(
            "controller policy: {} of {} columns admit more than one mode",
            columns.iter().filter(|s| s.len() > 1).count(),
            columns.len()
        );

        Self { speed_bins: n_speed, columns }
    }

    /// Modes enabled in `cell`
    pub fn enabled(&self, cell: CellIndex) -> ModeSet {
        self.columns
            .get(cell.gap * self.speed_bins + cell.speed)
            .copied()
            .unwrap_or(ModeSet::EMPTY)
    }

    /// `(gap, speed)` columns where `mode` is enabled, in index order
    pub fn columns_for(&self, mode: ControlMode) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.speed_bins;
        self.columns
            .iter()
            .enumerate()
            .filter(move |(_, set)| set.contains(mode))
            .map(move |(i, _)| (i / n, i % n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{AbstractionConfig, AbstractionEngine},
        grid::GridPreset,
    };
    use aebs_core::ProfileKind;

    fn policy(profile: ProfileKind, noise_rate: f64) -> (Imdp, ControllerPolicy) {
        let config = AbstractionConfig::new(GridPreset::Debug)
            .with_profile(profile)
            .with_noise_rate(noise_rate);
        let imdp = AbstractionEngine::new(&config).unwrap().build().unwrap();
        let policy = ControllerPolicy::closed_loop(&imdp);
        (imdp, policy)
    }

    #[test]
    fn every_cell_has_a_mode() {
        let (imdp, policy) = policy(ProfileKind::Industry, 0.0);
        let grid = imdp.grid();
        for i in 0..grid.num_cells() {
            assert!(!policy.enabled(grid.cell(i)).is_empty());
        }
    }

    #[test]
    fn standing_start_allows_nominal() {
        let (_, policy) = policy(ProfileKind::Industry, 0.0);
        // speed [0, 2): TTC can be unbounded
        let set = policy.enabled(CellIndex { gap: 10, speed: 0, accel: 0 });
        assert!(set.contains(ControlMode::Nominal));
    }

    #[test]
    fn near_and_fast_forces_emergency() {
        let (_, policy) = policy(ProfileKind::Industry, 0.0);
        // gap (5, 10], speed [28, 30): TTC at most 10 / 28 < 1 s
        let set = policy.enabled(CellIndex { gap: 1, speed: 14, accel: 3 });
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![ControlMode::EmergencyBraking]);
    }

    #[test]
    fn escalation_passes_through_warning() {
        let (_, policy) = policy(ProfileKind::Safe, 0.0);
        // gap (95, 100], speed [24, 26): TTC in [3.65, 4.17], so a controller
        // coming out of Nominal can only have reached Warning
        let set = policy.enabled(CellIndex { gap: 19, speed: 12, accel: 10 });
        assert!(set.contains(ControlMode::Warning));
        assert!(set.contains(ControlMode::EmergencyBraking));
    }

    #[test]
    fn hysteresis_holds_modes_above_the_thresholds() {
        let (imdp, policy) = policy(ProfileKind::Safe, 0.0);
        let grid = imdp.grid();
        let profile = imdp.config().profile.profile();

        // some column admits a mode its own TTC range would never trigger
        let held = (0..grid.num_cells()).map(|i| grid.cell(i)).any(|cell| {
            let gap = grid.gap_axis().bin(cell.gap);
            let speed = grid.speed_axis().bin(cell.speed);
            let highest = profile.target_mode(TimeToCollision::from_gap(gap.lo, speed.hi));
            policy.enabled(cell).iter().any(|m| m > highest)
        });
        assert!(held);
    }

    #[test]
    fn missed_detections_allow_nominal_everywhere() {
        let (imdp, policy) = policy(ProfileKind::Industry, 0.3);
        let grid = imdp.grid();
        for i in 0..grid.num_cells() {
            assert!(policy.enabled(grid.cell(i)).contains(ControlMode::Nominal));
        }
    }

    #[test]
    fn mode_set_basics() {
        let mut set = ModeSet::range(ControlMode::Warning, ControlMode::EmergencyBraking);
        assert_eq!(set.len(), 3);
        assert!(!set.contains(ControlMode::Nominal));
        assert!(set.insert(ControlMode::Nominal));
        assert!(!set.insert(ControlMode::Nominal));
        assert_eq!(ModeSet::EMPTY.union(set), set);
        assert!(ModeSet::EMPTY.is_empty());
    }
}
