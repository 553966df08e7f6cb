//! Longitudinal vehicle plant
//!
//! ## Dynamics
//!
//! A point-mass vehicle whose actual acceleration follows the command
//! through a first-order lag:
//! ```text
//! α   = 1 - exp(-dt / τ)                 (α = 0.5 at dt = 0.1 s)
//! a'  = clamp((1 - α)·a + α·u, -a_brake, a_drive)
//! v'  = v + a'·dt        if v' < 0: v' = 0, a' = 0
//! x'  = x + v'·dt        (world frame)
//! g'  = g - v'·dt        (following frame, stationary obstacle)
//! ```
//!
//! The lag is stored as the time constant τ, so any `dt` discretizes the same
//! continuous lag exactly. There is no drag term.
//!
//! ## Frames
//!
//! The simulator integrates ego and lead separately in the world frame
//! (`step`). The abstraction works in the following frame: gap to a
//! stationary obstacle, closing speed (= ego speed), ego acceleration
//! (`step_following`). `step_following_box` pushes a whole box of following
//! states through one step and returns a box that contains every image.
//!
//! ## Monotonicity
//!
//! Every update above is monotone in its inputs: `a'` is increasing in `a`,
//! `v'` in `v` and `a'`, `g'` increasing in `g` and decreasing in `v'`. The
//! lag update is written as `(1 - α)·a + α·u` rather than `a + α·(u - a)`
//! so that the floating-point evaluation is monotone as well; the box step
//! relies on this to enclose the point step bit-for-bit. The only
//! non-monotone piece is the standstill clamp, which zeroes `a'` and is
//! handled explicitly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::physics::{LAG_TIME_CONSTANT_S, MAX_ACCELERATION_MPS2, MAX_DECELERATION_MPS2},
    errors::{check_positive, ConfigResult},
    state::VehicleState,
};

/// Closed real interval `[lo, hi]`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    /// Lower end
    pub lo: f64,
    /// Upper end
    pub hi: f64,
}

impl Interval {
    /// Interval between two ends given in either order
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// Degenerate interval holding a single value
    pub fn point(x: f64) -> Self {
        Self { lo: x, hi: x }
    }

    /// Smallest interval containing `self` and `x`
    pub fn including(&self, x: f64) -> Self {
        Self { lo: self.lo.min(x), hi: self.hi.max(x) }
    }

    /// Membership, ends included
    pub fn contains(&self, x: f64) -> bool {
        self.lo <= x && x <= self.hi
    }

    /// `hi - lo`
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Midpoint
    pub fn center(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }

    /// Both ends finite
    pub fn is_finite(&self) -> bool {
        self.lo.is_finite() && self.hi.is_finite()
    }
}

/// State of the ego vehicle relative to a stationary obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FollowingState {
    /// Distance to the obstacle (m); zero or below is a collision
    pub gap: f64,
    /// Speed at which the gap shrinks (m/s), equal to ego speed
    pub closing_speed: f64,
    /// Ego acceleration (m/s²)
    pub accel: f64,
}

/// Axis-aligned box of following states
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FollowingBox {
    /// Gap range (m)
    pub gap: Interval,
    /// Closing-speed range (m/s)
    pub closing_speed: Interval,
    /// Acceleration range (m/s²)
    pub accel: Interval,
}

impl FollowingBox {
    /// Box membership, faces included
    pub fn contains(&self, s: &FollowingState) -> bool {
        self.gap.contains(s.gap)
            && self.closing_speed.contains(s.closing_speed)
            && self.accel.contains(s.accel)
    }

    /// Center of the box
    pub fn center(&self) -> FollowingState {
        FollowingState {
            gap: self.gap.center(),
            closing_speed: self.closing_speed.center(),
            accel: self.accel.center(),
        }
    }
}

/// Plant calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlantParams {
    /// Time constant of the acceleration lag (s)
    pub lag_time_constant: f64,
    /// Largest deceleration magnitude the tyres can deliver (m/s²)
    pub max_deceleration: f64,
    /// Largest forward acceleration (m/s²)
    pub max_acceleration: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            lag_time_constant: LAG_TIME_CONSTANT_S,
            max_deceleration: MAX_DECELERATION_MPS2,
            max_acceleration: MAX_ACCELERATION_MPS2,
        }
    }
}

impl PlantParams {
    /// Reject non-positive time constants and limits
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("plant.lag_time_constant", self.lag_time_constant)?;
        check_positive("plant.max_deceleration", self.max_deceleration)?;
        check_positive("plant.max_acceleration", self.max_acceleration)?;
        Ok(())
    }
}

/// Deterministic vehicle dynamics shared by simulator and abstraction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plant {
    params: PlantParams,
}

impl Plant {
    /// Plant with the given calibration
    pub fn new(params: PlantParams) -> Self {
        Self { params }
    }

    /// Calibration in use
    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// Fraction of the command error closed in one step of length `dt`
    pub fn lag_gain(&self, dt: f64) -> f64 {
        1.0 - libm::exp(-dt / self.params.lag_time_constant)
    }

    /// Clamp an acceleration to the physical limits
    pub fn clamp_accel(&self, a: f64) -> f64 {
        a.clamp(-self.params.max_deceleration, self.params.max_acceleration)
    }

    /// Lag update of the acceleration, without the standstill clamp
    fn lagged_accel(&self, accel: f64, command: f64, alpha: f64) -> f64 {
        let u = self.clamp_accel(command);
        self.clamp_accel((1.0 - alpha) * accel + alpha * u)
    }

    /// Advance speed and acceleration by one step
    ///
    /// Returns `(v', a')`. A vehicle cannot roll backwards: if the new speed
    /// would be negative it is set to zero and the acceleration with it.
    pub fn advance(&self, velocity: f64, accel: f64, command: f64, dt: f64) -> (f64, f64) {
        let alpha = self.lag_gain(dt);
        let a_next = self.lagged_accel(accel, command, alpha);
        let v_next = velocity + a_next * dt;
        if v_next < 0.0 {
            (0.0, 0.0)
        } else {
            (v_next, a_next)
        }
    }

    /// One world-frame step of a single vehicle
    pub fn step(&self, state: &VehicleState, command: f64, dt: f64) -> VehicleState {
        let (velocity, acceleration) = self.advance(state.velocity, state.acceleration, command, dt);
        VehicleState {
            position: state.position + velocity * dt,
            velocity,
            acceleration,
        }
    }

    /// One following-frame step against a stationary obstacle
    pub fn step_following(&self, state: &FollowingState, command: f64, dt: f64) -> FollowingState {
        let (closing_speed, accel) = self.advance(state.closing_speed, state.accel, command, dt);
        FollowingState {
            gap: state.gap - closing_speed * dt,
            closing_speed,
            accel,
        }
    }

    /// Enclosure of the one-step image of a box of following states
    ///
    /// For every `s` in `state_box`, `step_following(s, command, dt)` lies
    /// in the returned box.
    pub fn step_following_box(&self, state_box: &FollowingBox, command: f64, dt: f64) -> FollowingBox {
        let alpha = self.lag_gain(dt);
        let accel = Interval {
            lo: self.lagged_accel(state_box.accel.lo, command, alpha),
            hi: self.lagged_accel(state_box.accel.hi, command, alpha),
        };
        let raw_speed = Interval {
            lo: state_box.closing_speed.lo + accel.lo * dt,
            hi: state_box.closing_speed.hi + accel.hi * dt,
        };

        let (closing_speed, accel) = if raw_speed.hi < 0.0 {
            // every state in the box comes to rest
            (Interval::point(0.0), Interval::point(0.0))
        } else if raw_speed.lo < 0.0 {
            // some states stop (v' = a' = 0), the rest keep their lagged accel
            (Interval { lo: 0.0, hi: raw_speed.hi }, accel.including(0.0))
        } else {
            (raw_speed, accel)
        };

        FollowingBox {
            gap: Interval {
                lo: state_box.gap.lo - closing_speed.hi * dt,
                hi: state_box.gap.hi - closing_speed.lo * dt,
            },
            closing_speed,
            accel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f64 = 0.1;

    #[test]
    fn lag_closes_half_the_error_per_reference_step() {
        let plant = Plant::default();
        let (v, a) = plant.advance(10.0, 0.0, -4.0, DT);

        assert!((a + 2.0).abs() < 1e-12);
        assert!((v - 9.8).abs() < 1e-12);
    }

    #[test]
    fn braking_command_is_capped() {
        let plant = Plant::default();
        let mut state = VehicleState::cruising(0.0, 30.0);
        for _ in 0..20 {
            state = plant.step(&state, -50.0, DT);
            assert!(state.acceleration >= -MAX_DECELERATION_MPS2);
        }
        assert!(state.acceleration < -9.0);
    }

    #[test]
    fn vehicle_does_not_reverse() {
        let plant = Plant::default();
        let mut state = VehicleState { position: 0.0, velocity: 0.3, acceleration: -9.8 };
        state = plant.step(&state, -9.8, DT);

        assert_eq!(state.velocity, 0.0);
        assert_eq!(state.acceleration, 0.0);
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn stopped_vehicle_stays_stopped_under_braking() {
        let plant = Plant::default();
        let state = VehicleState::cruising(5.0, 0.0);
        let next = plant.step(&state, -4.0, DT);

        assert_eq!(next, state);
    }

    #[test]
    fn following_step_shrinks_gap_by_travelled_distance() {
        let plant = Plant::default();
        let s = FollowingState { gap: 40.0, closing_speed: 25.0, accel: 0.0 };
        let next = plant.step_following(&s, 0.0, DT);

        assert_eq!(next.closing_speed, 25.0);
        assert!((next.gap - 37.5).abs() < 1e-12);
    }

    #[test]
    fn box_step_covers_standstill_clamp() {
        let plant = Plant::default();
        let b = FollowingBox {
            gap: Interval::new(4.0, 5.0),
            closing_speed: Interval::new(0.0, 2.0),
            accel: Interval::new(-2.0, 0.0),
        };
        let image = plant.step_following_box(&b, -9.8, DT);

        assert_eq!(image.closing_speed.lo, 0.0);
        assert!(image.accel.contains(0.0));
        assert!(image.accel.lo < -5.0);
        assert!(image.gap.hi <= 5.0);
    }

    fn following_box() -> impl Strategy<Value = FollowingBox> {
        (
            0.0f64..100.0, 0.0f64..5.0,
            0.0f64..30.0, 0.0f64..3.0,
            -9.8f64..5.0, 0.0f64..2.0,
        )
            .prop_map(|(g, gw, v, vw, a, aw)| FollowingBox {
                gap: Interval::new(g, g + gw),
                closing_speed: Interval::new(v, v + vw),
                accel: Interval::new(a, (a + aw).min(5.0)),
            })
    }

    proptest! {
        #[test]
        fn step_is_finite_and_physical(
            x in -1e3f64..1e3,
            v in 0.0f64..60.0,
            a in -9.8f64..5.0,
            u in -20.0f64..10.0,
            dt in 0.01f64..0.5,
        ) {
            let plant = Plant::default();
            let next = plant.step(&VehicleState { position: x, velocity: v, acceleration: a }, u, dt);

            prop_assert!(next.is_finite());
            prop_assert!(next.velocity >= 0.0);
            prop_assert!(next.acceleration >= -MAX_DECELERATION_MPS2);
            prop_assert!(next.acceleration <= MAX_ACCELERATION_MPS2);
        }

        #[test]
        fn box_step_encloses_point_steps(
            b in following_box(),
            fg in 0.0f64..=1.0,
            fv in 0.0f64..=1.0,
            fa in 0.0f64..=1.0,
            u in -9.8f64..1.0,
        ) {
            let plant = Plant::default();
            let s = FollowingState {
                gap: b.gap.lo + fg * b.gap.width(),
                closing_speed: b.closing_speed.lo + fv * b.closing_speed.width(),
                accel: b.accel.lo + fa * b.accel.width(),
            };
            prop_assume!(b.contains(&s));

            let image = plant.step_following_box(&b, u, DT);
            let next = plant.step_following(&s, u, DT);
            prop_assert!(image.contains(&next), "{:?} not in {:?}", next, image);
        }
    }
}
