//! Interval MDP container
//!
//! Rows are addressed `cell · n_actions + action` and stored in one flat
//! transition array with row offsets. Each row lists its successors in
//! [`Successor`] order (Crash, Escape, then cells by index) with a
//! probability interval per successor; successors with upper bound 0 are
//! omitted.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use aebs_core::ControlMode;

use crate::{
    engine::AbstractionConfig,
    errors::{AbstractionError, AbstractionResult},
    grid::{CellIndex, Grid, Successor},
};

/// Slack allowed when checking `Σ lower ≤ 1 ≤ Σ upper`
pub const COVERAGE_TOLERANCE: f64 = 1e-9;

/// Probability interval for one successor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntervalTransition {
    /// Where the step lands
    pub target: Successor,
    /// Lower probability bound
    pub lower: f64,
    /// Upper probability bound
    pub upper: f64,
}

/// Sums of lower and upper bounds over a row
pub fn coverage(row: &[IntervalTransition]) -> (f64, f64) {
    row.iter()
        .fold((0.0, 0.0), |(lo, hi), t| (lo + t.lower, hi + t.upper))
}

/// Check one row: every interval inside [0, 1] and the sums admit a distribution
pub fn check_row(cell: usize, action: ControlMode, row: &[IntervalTransition]) -> AbstractionResult<()> {
    for t in row {
        let ok = t.lower.is_finite()
            && t.upper.is_finite()
            && 0.0 <= t.lower
            && t.lower <= t.upper
            && t.upper <= 1.0;
        if !ok {
            return Err(AbstractionError::InvalidInterval {
                cell,
                action,
                target: t.target,
                lower: t.lower,
                upper: t.upper,
            });
        }
    }
    let (lower_sum, upper_sum) = coverage(row);
    if lower_sum > 1.0 + COVERAGE_TOLERANCE || upper_sum < 1.0 - COVERAGE_TOLERANCE {
        return Err(AbstractionError::CoverageViolation { cell, action, lower_sum, upper_sum });
    }
    Ok(())
}

/// Grid abstraction with interval transition bounds
#[derive(Debug, Clone)]
pub struct Imdp {
    config: AbstractionConfig,
    grid: Grid,
    actions: Vec<ControlMode>,
    initial: CellIndex,
    offsets: Vec<usize>,
    transitions: Vec<IntervalTransition>,
}

impl Imdp {
    /// Assemble from one row per (cell, action), in row order
    ///
    /// Only the row count is checked here; [`Imdp::validate`] checks the
    /// bounds themselves.
    pub fn new(
        config: AbstractionConfig,
        grid: Grid,
        actions: Vec<ControlMode>,
        initial: CellIndex,
        rows: Vec<Vec<IntervalTransition>>,
    ) -> AbstractionResult<Self> {
        let expected = grid.num_cells() * actions.len();
        if rows.len() != expected {
            return Err(AbstractionError::Shape { expected, found: rows.len() });
        }

        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut transitions = Vec::with_capacity(rows.iter().map(Vec::len).sum());
        offsets.push(0);
        for row in rows {
            transitions.extend(row);
            offsets.push(transitions.len());
        }

        Ok(Self { config, grid, actions, initial, offsets, transitions })
    }

    /// Configuration the model was built from
    pub fn config(&self) -> &AbstractionConfig {
        &self.config
    }

    /// The state partition
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Actions in row order
    pub fn actions(&self) -> &[ControlMode] {
        &self.actions
    }

    /// Cell holding the initial state
    pub fn initial(&self) -> CellIndex {
        self.initial
    }

    /// Number of grid cells
    pub fn num_cells(&self) -> usize {
        self.grid.num_cells()
    }

    /// Number of (cell, action) rows
    pub fn num_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of interval transitions
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Position of `action` in the row layout
    pub fn action_index(&self, action: ControlMode) -> Option<usize> {
        self.actions.iter().position(|a| *a == action)
    }

    /// Transitions of row `r`
    pub fn row(&self, r: usize) -> &[IntervalTransition] {
        match (self.offsets.get(r), self.offsets.get(r + 1)) {
            (Some(&start), Some(&end)) => &self.transitions[start..end],
            _ => &[],
        }
    }

    /// Transitions of `cell` under `action`; empty for unknown actions
    pub fn transitions(&self, cell: usize, action: ControlMode) -> &[IntervalTransition] {
        match self.action_index(action) {
            Some(a) => self.row(cell * self.actions.len() + a),
            None => &[],
        }
    }

    /// All rows as `(cell, action, transitions)`
    pub fn rows(&self) -> impl Iterator<Item = (usize, ControlMode, &[IntervalTransition])> + '_ {
        let n = self.actions.len();
        (0..self.num_rows()).map(move |r| (r / n, self.actions[r % n], self.row(r)))
    }

    /// Check every row; the first bad row is reported
    pub fn validate(&self) -> AbstractionResult<()> {
        self.rows().try_for_each(|(cell, action, row)| check_row(cell, action, row))
    }

    /// Row with an intact structure but possibly unusable bounds, for tests
    /// of downstream checks
    #[cfg(test)]
    pub(crate) fn row_mut(&mut self, r: usize) -> &mut [IntervalTransition] {
        let (start, end) = (self.offsets[r], self.offsets[r + 1]);
        &mut self.transitions[start..end]
    }
}
