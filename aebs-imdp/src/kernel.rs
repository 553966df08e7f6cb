//! One-dimensional probability bounds
//!
//! The successor of a cell under one command is `x + w`, where the
//! deterministic part `x` ranges over an enclosure `[m_lo, m_hi]` and `w` is
//! optional process noise. For a target interval `(l, h)` this module bounds
//!
//! ```text
//! f(x) = P(x + w ∈ (l, h))        over x ∈ [m_lo, m_hi]
//! ```
//!
//! ## Noise-free
//!
//! `f` is an indicator. Its minimum is 1 only when the whole enclosure sits
//! strictly inside the target; its maximum is 1 whenever the closed
//! intervals touch. Strict/closed comparisons make the bounds hold whichever
//! ends the target actually includes.
//!
//! ## Truncated Gaussian noise
//!
//! With `w ~ N(0, σ²)` truncated to `±kσ` and renormalized, `f` is the
//! convolution of a log-concave density with an indicator and therefore
//! unimodal, peaking at the target's center. Over `[m_lo, m_hi]`:
//! - minimum at one of the two ends
//! - maximum at the center clamped into the range (an end when the target
//!   is unbounded on one side, where `f` is monotone)
//!
//! Both are evaluated in closed form from `erfc`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use aebs_core::{
    errors::{check_non_negative, ConfigResult},
    Interval,
};

/// Truncation point of the process noise, in standard deviations
pub const TRUNCATION_SIGMAS: f64 = 4.0;

/// Amount by which bounds strictly inside (0, 1) are widened
pub const ROUNDING_MARGIN: f64 = 1e-12;

/// Probability interval `[lower, upper]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest probability over the source set
    pub lower: f64,
    /// Largest probability over the source set
    pub upper: f64,
}

impl Bounds {
    /// Certain event
    pub const ONE: Bounds = Bounds { lower: 1.0, upper: 1.0 };

    /// Impossible event
    pub const ZERO: Bounds = Bounds { lower: 0.0, upper: 0.0 };

    /// Bounds on the product of two independent probabilities
    pub fn product(self, other: Bounds) -> Bounds {
        Bounds {
            lower: self.lower * other.lower,
            upper: self.upper * other.upper,
        }
    }

    /// Bounds on the sum of two disjoint events' probabilities
    pub fn sum(self, other: Bounds) -> Bounds {
        Bounds {
            lower: self.lower + other.lower,
            upper: (self.upper + other.upper).min(1.0),
        }
    }

    /// Weight both ends by `w`
    pub fn scaled(self, w: f64) -> Bounds {
        Bounds { lower: self.lower * w, upper: self.upper * w }
    }

    /// Widen ends strictly inside (0, 1) by [`ROUNDING_MARGIN`]
    pub fn widened(self) -> Bounds {
        let lower = if self.lower > 0.0 && self.lower < 1.0 {
            (self.lower - ROUNDING_MARGIN).max(0.0)
        } else {
            self.lower.clamp(0.0, 1.0)
        };
        let upper = if self.upper > 0.0 && self.upper < 1.0 {
            (self.upper + ROUNDING_MARGIN).min(1.0)
        } else {
            self.upper.clamp(0.0, 1.0)
        };
        Bounds { lower, upper }
    }

    /// Upper end is zero
    pub fn is_impossible(&self) -> bool {
        self.upper <= 0.0
    }
}

/// Zero-mean Gaussian truncated at `±k·σ`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedGaussian {
    sigma: f64,
    k: f64,
    mass: f64,
    tail: f64,
}

impl TruncatedGaussian {
    /// Noise with standard deviation `sigma` (> 0) truncated at `k` sigmas
    pub fn new(sigma: f64, k: f64) -> Self {
        let tail = std_normal_cdf(-k);
        Self { sigma, k, mass: 1.0 - 2.0 * tail, tail }
    }

    /// Half-width of the support
    pub fn radius(&self) -> f64 {
        self.k * self.sigma
    }

    /// CDF of the truncated distribution
    pub fn cdf(&self, z: f64) -> f64 {
        if z <= -self.radius() {
            0.0
        } else if z >= self.radius() {
            1.0
        } else {
            ((std_normal_cdf(z / self.sigma) - self.tail) / self.mass).clamp(0.0, 1.0)
        }
    }
}

fn std_normal_cdf(z: f64) -> f64 {
    0.5 * libm::erfc(-z / core::f64::consts::SQRT_2)
}

/// Per-dimension standard deviations of the additive process noise
///
/// A zero entry leaves that dimension noise-free.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessNoise {
    /// Gap noise (m)
    pub gap: f64,
    /// Speed noise (m/s)
    pub speed: f64,
    /// Acceleration noise (m/s²)
    pub accel: f64,
}

impl ProcessNoise {
    /// Same standard deviation on every dimension
    pub fn uniform(sigma: f64) -> Self {
        Self { gap: sigma, speed: sigma, accel: sigma }
    }

    /// Reject negative or non-finite deviations
    pub fn validate(&self) -> ConfigResult<()> {
        check_non_negative("process_noise.gap", self.gap)?;
        check_non_negative("process_noise.speed", self.speed)?;
        check_non_negative("process_noise.accel", self.accel)?;
        Ok(())
    }

    /// Kernels `(gap, speed, accel)`
    pub fn kernels(&self) -> [Kernel; 3] {
        [Kernel::new(self.gap), Kernel::new(self.speed), Kernel::new(self.accel)]
    }
}

/// Distribution of the additive noise on one dimension
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Deterministic successor
    Exact,
    /// Truncated Gaussian noise
    Gaussian(TruncatedGaussian),
}

impl Kernel {
    /// Exact for `sigma == 0`, truncated Gaussian otherwise
    pub fn new(sigma: f64) -> Self {
        if sigma > 0.0 {
            Kernel::Gaussian(TruncatedGaussian::new(sigma, TRUNCATION_SIGMAS))
        } else {
            Kernel::Exact
        }
    }

    /// Set of values the noisy successor can take
    pub fn support(&self, mean: Interval) -> Interval {
        match self {
            Kernel::Exact => mean,
            Kernel::Gaussian(g) => Interval { lo: mean.lo - g.radius(), hi: mean.hi + g.radius() },
        }
    }

    /// Probability that `x + w` falls in `(l, h)` for the point `x`
    pub fn probability_at(&self, x: f64, l: f64, h: f64) -> f64 {
        match self {
            Kernel::Exact => {
                if l < x && x < h {
                    1.0
                } else {
                    0.0
                }
            }
            Kernel::Gaussian(g) => {
                let upper = if h == f64::INFINITY { 1.0 } else { g.cdf(h - x) };
                let lower = if l == f64::NEG_INFINITY { 0.0 } else { g.cdf(l - x) };
                (upper - lower).max(0.0)
            }
        }
    }

    /// Bounds on `P(x + w ∈ (l, h))` over `x ∈ mean`
    ///
    /// Either end of the target may be infinite.
    pub fn bounds(&self, mean: Interval, l: f64, h: f64) -> Bounds {
        if l == f64::NEG_INFINITY && h == f64::INFINITY {
            return Bounds::ONE;
        }
        match self {
            Kernel::Exact => Bounds {
                lower: if l < mean.lo && mean.hi < h { 1.0 } else { 0.0 },
                upper: if mean.lo <= h && mean.hi >= l { 1.0 } else { 0.0 },
            },
            Kernel::Gaussian(_) => {
                let at_lo = self.probability_at(mean.lo, l, h);
                let at_hi = self.probability_at(mean.hi, l, h);
                let peak = if l == f64::NEG_INFINITY {
                    mean.lo
                } else if h == f64::INFINITY {
                    mean.hi
                } else {
                    (0.5 * (l + h)).clamp(mean.lo, mean.hi)
                };
                let at_peak = self.probability_at(peak, l, h);
                Bounds {
                    lower: at_lo.min(at_hi),
                    upper: at_peak.max(at_lo).max(at_hi),
                }
            }
        }
    }
}
