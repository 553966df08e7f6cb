//! State-space grid
//!
//! ## Envelope
//!
//! The abstraction frame has three dimensions, each split into bins of a
//! fixed resolution:
//!
//! | Axis  | Quantity              | Bins         | Below the range   | Above the range |
//! |-------|-----------------------|--------------|-------------------|-----------------|
//! | gap   | distance to obstacle  | `(l, h]`     | Crash             | Escape          |
//! | speed | closing (= ego) speed | `[l, h)`     | clamped to bin 0  | Escape          |
//! | accel | ego acceleration      | `[l, h)`     | clamped to bin 0  | clamped to last |
//!
//! A resolution that does not divide the range leaves a shorter last bin.
//! The gap and speed ranges start at zero; the acceleration range must
//! cover the actuator limits so that every reachable state has a cell.
//!
//! ## Indexing
//!
//! Cells are stored flat, gap-major: `(gap · n_speed + speed) · n_accel + accel`.
//! Successors of a transition are `Crash`, `Escape` or a flat cell index.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use aebs_core::{
    errors::{check_positive, check_span, ConfigError, ConfigResult},
    FollowingBox, FollowingState, Interval, PlantParams,
};

/// Default gap envelope (m)
pub const DEFAULT_GAP_RANGE_M: (f64, f64) = (0.0, 100.0);

/// Default speed envelope (m/s)
pub const DEFAULT_SPEED_RANGE_MPS: (f64, f64) = (0.0, 30.0);

/// Default acceleration envelope (m/s²)
pub const DEFAULT_ACCEL_RANGE_MPS2: (f64, f64) = (-10.0, 5.0);

/// Largest number of cells a grid may have (cells are exported as `u32`)
pub const MAX_CELLS: usize = u32::MAX as usize;

/// Named grid resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GridPreset {
    /// 5 m × 2 m/s × 1 m/s², for quick checks
    Debug,
    /// 2 m × 1 m/s × 0.5 m/s²
    Coarse,
    /// 1 m × 0.5 m/s × 0.25 m/s²
    Medium,
    /// 0.5 m × 0.1 m/s × 0.1 m/s²
    Fine,
}

impl GridPreset {
    /// Resolutions `(gap, speed, accel)`
    pub fn resolution(self) -> (f64, f64, f64) {
        match self {
            GridPreset::Debug => (5.0, 2.0, 1.0),
            GridPreset::Coarse => (2.0, 1.0, 0.5),
            GridPreset::Medium => (1.0, 0.5, 0.25),
            GridPreset::Fine => (0.5, 0.1, 0.1),
        }
    }

    /// Preset by lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "debug" => Some(GridPreset::Debug),
            "coarse" => Some(GridPreset::Coarse),
            "medium" => Some(GridPreset::Medium),
            "fine" => Some(GridPreset::Fine),
            _ => None,
        }
    }
}

/// Range and resolution of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisSpec {
    /// Lower end of the envelope
    pub lo: f64,
    /// Upper end of the envelope
    pub hi: f64,
    /// Bin width
    pub resolution: f64,
}

impl AxisSpec {
    /// Axis over `range` with bins of width `resolution`
    pub fn new(range: (f64, f64), resolution: f64) -> Self {
        Self { lo: range.0, hi: range.1, resolution }
    }
}

/// Grid declaration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// Gap axis (m)
    pub gap: AxisSpec,
    /// Closing-speed axis (m/s)
    pub speed: AxisSpec,
    /// Acceleration axis (m/s²)
    pub accel: AxisSpec,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::preset(GridPreset::Coarse)
    }
}

impl GridConfig {
    /// Default envelope with the given resolutions
    pub fn with_resolution(gap: f64, speed: f64, accel: f64) -> Self {
        Self {
            gap: AxisSpec::new(DEFAULT_GAP_RANGE_M, gap),
            speed: AxisSpec::new(DEFAULT_SPEED_RANGE_MPS, speed),
            accel: AxisSpec::new(DEFAULT_ACCEL_RANGE_MPS2, accel),
        }
    }

    /// Default envelope at a named resolution
    pub fn preset(preset: GridPreset) -> Self {
        let (gap, speed, accel) = preset.resolution();
        Self::with_resolution(gap, speed, accel)
    }

    /// Replace the gap envelope's upper end
    pub fn with_max_gap(mut self, max_gap: f64) -> Self {
        self.gap.hi = max_gap;
        self
    }

    /// Replace the speed envelope's upper end
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.speed.hi = max_speed;
        self
    }

    /// Check ranges, resolutions and cell count against the plant limits
    pub fn validate(&self, plant: &PlantParams) -> ConfigResult<()> {
        self.build_axes().map(|_| ())?;
        if self.gap.lo != 0.0 {
            return Err(ConfigError::OutOfRange { field: "grid.gap.lo", value: self.gap.lo, min: 0.0, max: 0.0 });
        }
        if self.speed.lo != 0.0 {
            return Err(ConfigError::OutOfRange { field: "grid.speed.lo", value: self.speed.lo, min: 0.0, max: 0.0 });
        }
        if self.accel.lo > -plant.max_deceleration || self.accel.hi < plant.max_acceleration {
            return Err(ConfigError::Unordered {
                field: "grid.accel",
                relation: "lo <= -max_deceleration and hi >= max_acceleration",
            });
        }
        Ok(())
    }

    fn build_axes(&self) -> ConfigResult<(Axis, Axis, Axis)> {
        let gap = Axis::new("grid.gap", self.gap)?;
        let speed = Axis::new("grid.speed", self.speed)?;
        let accel = Axis::new("grid.accel", self.accel)?;

        let cells = gap
            .len()
            .checked_mul(speed.len())
            .and_then(|n| n.checked_mul(accel.len()))
            .unwrap_or(usize::MAX);
        if cells > MAX_CELLS {
            return Err(ConfigError::OutOfRange {
                field: "grid.cells",
                value: cells as f64,
                min: 1.0,
                max: MAX_CELLS as f64,
            });
        }
        Ok((gap, speed, accel))
    }
}

/// One discretized dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    lo: f64,
    hi: f64,
    resolution: f64,
    len: usize,
}

impl Axis {
    /// Validate `spec` and count its bins
    pub fn new(field: &'static str, spec: AxisSpec) -> ConfigResult<Self> {
        let (lo, hi) = check_span(field, spec.lo, spec.hi)?;
        let resolution = check_positive(field, spec.resolution)?;
        let bins = libm::ceil((hi - lo) / resolution - 1e-9).max(1.0);
        if bins > MAX_CELLS as f64 {
            return Err(ConfigError::OutOfRange { field, value: bins, min: 1.0, max: MAX_CELLS as f64 });
        }
        Ok(Self { lo, hi, resolution, len: bins as usize })
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.len
    }

    /// Lower end of the envelope
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Upper end of the envelope
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Bin width
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Lower edge of bin `i`; bin `len` gives the envelope's upper end
    pub fn edge(&self, i: usize) -> f64 {
        if i >= self.len {
            self.hi
        } else {
            (self.lo + i as f64 * self.resolution).min(self.hi)
        }
    }

    /// Finite extent of bin `i`
    pub fn bin(&self, i: usize) -> Interval {
        Interval { lo: self.edge(i), hi: self.edge(i + 1) }
    }

    /// Bin containing `x` for half-open `[l, h)` bins, clamped to the axis
    pub fn bin_right_open(&self, x: f64) -> usize {
        let mut i = self.guess(x);
        while i > 0 && x < self.edge(i) {
            i -= 1;
        }
        while i + 1 < self.len && x >= self.edge(i + 1) {
            i += 1;
        }
        i
    }

    /// Bin containing `x` for half-open `(l, h]` bins, clamped to the axis
    pub fn bin_left_open(&self, x: f64) -> usize {
        let mut i = self.guess(x);
        while i > 0 && x <= self.edge(i) {
            i -= 1;
        }
        while i + 1 < self.len && x > self.edge(i + 1) {
            i += 1;
        }
        i
    }

    /// Inclusive bin range that may overlap `[lo, hi]`, widened by one bin
    /// on each side and clamped to the axis
    pub fn overlapping(&self, span: Interval) -> (usize, usize) {
        let first = self.guess(span.lo).saturating_sub(1);
        let last = (self.guess(span.hi) + 1).min(self.len - 1);
        (first, last.max(first))
    }

    fn guess(&self, x: f64) -> usize {
        let i = libm::floor((x - self.lo) / self.resolution);
        if i.is_nan() || i < 0.0 {
            0
        } else if i >= (self.len - 1) as f64 {
            self.len - 1
        } else {
            i as usize
        }
    }
}

/// Integer coordinates of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellIndex {
    /// Gap bin
    pub gap: usize,
    /// Speed bin
    pub speed: usize,
    /// Acceleration bin
    pub accel: usize,
}

/// Target of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Successor {
    /// Absorbing collision state (gap ≤ 0)
    Crash,
    /// Absorbing state for everything outside the envelope
    Escape,
    /// Grid cell by flat index
    Cell(u32),
}

impl fmt::Display for Successor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Successor::Crash => f.write_str("crash"),
            Successor::Escape => f.write_str("escape"),
            Successor::Cell(i) => write!(f, "cell {}", i),
        }
    }
}

/// The partition of the following-frame state space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    gap: Axis,
    speed: Axis,
    accel: Axis,
}

impl Grid {
    /// Build the grid, checking it against the plant limits
    pub fn new(config: &GridConfig, plant: &PlantParams) -> ConfigResult<Self> {
        config.validate(plant)?;
        let (gap, speed, accel) = config.build_axes()?;
        Ok(Self { gap, speed, accel })
    }

    /// Gap axis
    pub fn gap_axis(&self) -> &Axis {
        &self.gap
    }

    /// Speed axis
    pub fn speed_axis(&self) -> &Axis {
        &self.speed
    }

    /// Acceleration axis
    pub fn accel_axis(&self) -> &Axis {
        &self.accel
    }

    /// Bins per axis `(gap, speed, accel)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.gap.len(), self.speed.len(), self.accel.len())
    }

    /// Total number of cells
    pub fn num_cells(&self) -> usize {
        self.gap.len() * self.speed.len() * self.accel.len()
    }

    /// Flat index of `cell`
    pub fn flat(&self, cell: CellIndex) -> usize {
        (cell.gap * self.speed.len() + cell.speed) * self.accel.len() + cell.accel
    }

    /// Coordinates of flat index `i`
    pub fn cell(&self, i: usize) -> CellIndex {
        let accel = i % self.accel.len();
        let rest = i / self.accel.len();
        CellIndex {
            gap: rest / self.speed.len(),
            speed: rest % self.speed.len(),
            accel,
        }
    }

    /// Finite box covered by a cell
    pub fn cell_box(&self, cell: CellIndex) -> FollowingBox {
        FollowingBox {
            gap: self.gap.bin(cell.gap),
            closing_speed: self.speed.bin(cell.speed),
            accel: self.accel.bin(cell.accel),
        }
    }

    /// Where a concrete state falls
    pub fn locate(&self, state: &FollowingState) -> Successor {
        if state.gap <= 0.0 {
            return Successor::Crash;
        }
        if state.gap > self.gap.hi() || state.closing_speed >= self.speed.hi() {
            return Successor::Escape;
        }
        let cell = CellIndex {
            gap: self.gap.bin_left_open(state.gap),
            speed: self.speed.bin_right_open(state.closing_speed),
            accel: self.accel.bin_right_open(state.accel),
        };
        Successor::Cell(self.flat(cell) as u32)
    }
}
