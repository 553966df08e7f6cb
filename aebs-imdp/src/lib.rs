//! Interval MDP abstraction of the AEBS model
//!
//! Discretizes the following frame (gap, closing speed, acceleration) into a
//! grid and computes, for every cell and braking mode, sound lower and upper
//! bounds on the one-step transition probabilities. The result is exported
//! as a PRISM `imdp` model with `crash` and `escape` labels, ready for a
//! query such as `Pmax=? [ F "crash" ]`.
//!
//! ## Pipeline
//!
//! ```text
//! AbstractionConfig ─► AbstractionEngine::build ─► Imdp ─► PrismExporter ─► .prism
//!                          │                                    ▲
//!                          └─ Plant::step_following_box         └─ ControllerPolicy (optional)
//!                             ControllerProfile::next_mode
//! ```
//!
//! The engine reuses the plant and controller functions of `aebs-core`, so
//! the abstraction and the simulator agree on the physics.
//!
//! ```no_run
//! use aebs_imdp::{AbstractionConfig, AbstractionEngine, ControllerPolicy, GridPreset, PrismExporter};
//! use aebs_core::ProfileKind;
//!
//! let config = AbstractionConfig::new(GridPreset::Coarse)
//!     .with_profile(ProfileKind::Safe)
//!     .with_noise_rate(0.1);
//! let imdp = AbstractionEngine::new(&config)?.build()?;
//!
//! let policy = ControllerPolicy::closed_loop(&imdp);
//! PrismExporter::new(&imdp)
//!     .with_policy(&policy)
//!     .write_model("aebs_safe.prism")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod engine;
pub mod errors;
pub mod export;
pub mod grid;
pub mod imdp;
pub mod kernel;
pub mod parse;
pub mod policy;

pub use engine::{AbstractionConfig, AbstractionEngine, Branch};
pub use errors::{
    AbstractionError, AbstractionResult, ExportError, ExportResult, ParseError, ParseResult,
};
pub use export::{export, write_model, PrismExporter};
pub use grid::{CellIndex, Grid, GridConfig, GridPreset, Successor};
pub use imdp::{Imdp, IntervalTransition};
pub use kernel::ProcessNoise;
pub use parse::{parse_model, ParsedCommand, ParsedModel};
pub use policy::{ControllerPolicy, ModeSet};
