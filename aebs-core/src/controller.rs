//! Three-tier TTC braking controller
//!
//! ## Modes
//!
//! ```text
//! Nominal ──► Warning ──► PartialBraking ──► EmergencyBraking
//!    ▲            │              │                  │
//!    └────────────┴──────────────┴──── one level ◄──┘
//! ```
//!
//! Each mode commands a fixed deceleration from the active profile
//! (Nominal commands none). The guard is the TTC of the *perceived*
//! obstacle; a missed detection reads as "not closing".
//!
//! ## Transition rule
//!
//! `next_mode(mode, ttc)`:
//! 1. TTC below the emergency trigger: EmergencyBraking, from any mode.
//! 2. Threshold target above the current mode: escalate one level.
//! 3. Target below the current mode: relax one level, but only once TTC has
//!    cleared the current mode's trigger by the hysteresis margin.
//! 4. Otherwise stay.
//!
//! At most one transition per control cycle, and the result never gets less
//! urgent as TTC decreases. The controller keeps no state besides its mode,
//! so the rule is a pure function that the abstraction reuses directly.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use core::fmt;

use crate::{
    constants::profiles::*,
    errors::{check_non_negative, check_positive, ConfigError, ConfigResult},
    perception::PerceivedObstacle,
    state::TimeToCollision,
};

/// Braking mode, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ControlMode {
    /// No intervention
    #[default]
    Nominal,
    /// Driver warning (and, for the Safe profile, light pre-braking)
    Warning,
    /// Moderate automatic braking
    PartialBraking,
    /// Full braking at the friction limit
    EmergencyBraking,
}

impl ControlMode {
    /// All modes in increasing urgency
    pub const ALL: [ControlMode; 4] = [
        ControlMode::Nominal,
        ControlMode::Warning,
        ControlMode::PartialBraking,
        ControlMode::EmergencyBraking,
    ];

    /// Urgency level, 0 for Nominal up to 3 for EmergencyBraking
    pub fn level(self) -> usize {
        self as usize
    }

    /// Mode with the given urgency level
    pub fn from_level(level: usize) -> Option<Self> {
        Self::ALL.get(level).copied()
    }

    /// One level more urgent (saturates at EmergencyBraking)
    pub fn escalated(self) -> Self {
        Self::from_level(self.level() + 1).unwrap_or(ControlMode::EmergencyBraking)
    }

    /// One level less urgent (saturates at Nominal)
    pub fn relaxed(self) -> Self {
        self.level()
            .checked_sub(1)
            .and_then(Self::from_level)
            .unwrap_or(ControlMode::Nominal)
    }

    /// Identifier used as the action label in exported models
    pub fn name(self) -> &'static str {
        match self {
            ControlMode::Nominal => "nominal",
            ControlMode::Warning => "warning",
            ControlMode::PartialBraking => "partial_braking",
            ControlMode::EmergencyBraking => "emergency_braking",
        }
    }

    /// Inverse of [`ControlMode::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The two shipped calibrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProfileKind {
    /// Late, comfort-first braking (sub-second emergency trigger)
    Industry,
    /// Early braking with margin for missed detections
    Safe,
}

impl ProfileKind {
    /// Calibration data for this kind
    pub fn profile(self) -> ControllerProfile {
        match self {
            ProfileKind::Industry => ControllerProfile::industry(),
            ProfileKind::Safe => ControllerProfile::safe(),
        }
    }
}

/// Thresholds and decelerations of one controller calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerProfile {
    /// Enter Warning below this TTC (s)
    pub ttc_warning: f64,
    /// Enter PartialBraking below this TTC (s)
    pub ttc_partial: f64,
    /// Enter EmergencyBraking below this TTC (s)
    pub ttc_emergency: f64,
    /// Deceleration magnitude in Warning (m/s²)
    pub decel_warning: f64,
    /// Deceleration magnitude in PartialBraking (m/s²)
    pub decel_partial: f64,
    /// Deceleration magnitude in EmergencyBraking (m/s²)
    pub decel_emergency: f64,
    /// Margin above a mode's trigger before relaxing out of it (s)
    pub hysteresis: f64,
}

impl ControllerProfile {
    /// Industry calibration
    pub fn industry() -> Self {
        Self {
            ttc_warning: INDUSTRY_TTC_WARNING_S,
            ttc_partial: INDUSTRY_TTC_PARTIAL_S,
            ttc_emergency: INDUSTRY_TTC_EMERGENCY_S,
            decel_warning: INDUSTRY_DECEL_WARNING_MPS2,
            decel_partial: INDUSTRY_DECEL_PARTIAL_MPS2,
            decel_emergency: INDUSTRY_DECEL_EMERGENCY_MPS2,
            hysteresis: INDUSTRY_HYSTERESIS_S,
        }
    }

    /// Safe calibration
    pub fn safe() -> Self {
        Self {
            ttc_warning: SAFE_TTC_WARNING_S,
            ttc_partial: SAFE_TTC_PARTIAL_S,
            ttc_emergency: SAFE_TTC_EMERGENCY_S,
            decel_warning: SAFE_DECEL_WARNING_MPS2,
            decel_partial: SAFE_DECEL_PARTIAL_MPS2,
            decel_emergency: SAFE_DECEL_EMERGENCY_MPS2,
            hysteresis: SAFE_HYSTERESIS_S,
        }
    }

    /// Check `0 < T_emergency < T_partial < T_warning` and
    /// `0 ≤ decel_warning ≤ decel_partial ≤ decel_emergency`
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("profile.ttc_emergency", self.ttc_emergency)?;
        check_positive("profile.ttc_partial", self.ttc_partial)?;
        check_positive("profile.ttc_warning", self.ttc_warning)?;
        if !(self.ttc_emergency < self.ttc_partial && self.ttc_partial < self.ttc_warning) {
            return Err(ConfigError::Unordered {
                field: "profile.ttc",
                relation: "emergency < partial < warning",
            });
        }

        check_non_negative("profile.decel_warning", self.decel_warning)?;
        check_non_negative("profile.decel_partial", self.decel_partial)?;
        check_non_negative("profile.decel_emergency", self.decel_emergency)?;
        if !(self.decel_warning <= self.decel_partial && self.decel_partial <= self.decel_emergency) {
            return Err(ConfigError::Unordered {
                field: "profile.decel",
                relation: "warning <= partial <= emergency",
            });
        }

        check_non_negative("profile.hysteresis", self.hysteresis)?;
        Ok(())
    }

    /// TTC below which `mode` is entered; `None` for Nominal
    pub fn trigger(&self, mode: ControlMode) -> Option<f64> {
        match mode {
            ControlMode::Nominal => None,
            ControlMode::Warning => Some(self.ttc_warning),
            ControlMode::PartialBraking => Some(self.ttc_partial),
            ControlMode::EmergencyBraking => Some(self.ttc_emergency),
        }
    }

    /// Deceleration magnitude commanded in `mode` (m/s²)
    pub fn deceleration(&self, mode: ControlMode) -> f64 {
        match mode {
            ControlMode::Nominal => 0.0,
            ControlMode::Warning => self.decel_warning,
            ControlMode::PartialBraking => self.decel_partial,
            ControlMode::EmergencyBraking => self.decel_emergency,
        }
    }

    /// Signed acceleration command for `mode` (m/s², ≤ 0)
    pub fn command(&self, mode: ControlMode) -> f64 {
        -self.deceleration(mode)
    }

    /// Mode the thresholds call for, ignoring history
    pub fn target_mode(&self, ttc: TimeToCollision) -> ControlMode {
        if ttc.below(self.ttc_emergency) {
            ControlMode::EmergencyBraking
        } else if ttc.below(self.ttc_partial) {
            ControlMode::PartialBraking
        } else if ttc.below(self.ttc_warning) {
            ControlMode::Warning
        } else {
            ControlMode::Nominal
        }
    }

    /// Pure mode transition for one control cycle
    pub fn next_mode(&self, mode: ControlMode, ttc: TimeToCollision) -> ControlMode {
        let target = self.target_mode(ttc);

        if target == ControlMode::EmergencyBraking {
            return ControlMode::EmergencyBraking;
        }
        if target > mode {
            return mode.escalated();
        }
        if target < mode {
            let cleared = match self.trigger(mode) {
                Some(trigger) => !ttc.below(trigger + self.hysteresis),
                None => true,
            };
            if cleared {
                return mode.relaxed();
            }
        }
        mode
    }
}

/// Controller instance: a profile plus the current mode
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    profile: ControllerProfile,
    mode: ControlMode,
}

impl Controller {
    /// Controller in Nominal mode
    pub fn new(profile: ControllerProfile) -> Self {
        Self { profile, mode: ControlMode::Nominal }
    }

    /// Current mode
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Active calibration
    pub fn profile(&self) -> &ControllerProfile {
        &self.profile
    }

    /// Acceleration command for the current mode
    pub fn command(&self) -> f64 {
        self.profile.command(self.mode)
    }

    /// Advance the mode from one observation and return the new command
    pub fn update(&mut self, observation: &PerceivedObstacle) -> f64 {
        let next = self.profile.next_mode(self.mode, observation.ttc());
        if next != self.mode {
            log_debug!("mode {} -> {} (ttc {:?})", self.mode, next, observation.ttc());
        }
        self.mode = next;
        self.command()
    }

    /// Back to Nominal
    pub fn reset(&mut self) {
        self.mode = ControlMode::Nominal;
    }
}
