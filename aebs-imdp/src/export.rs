//! PRISM interval-MDP export
//!
//! ## Layout
//!
//! ```text
//! imdp
//!
//! module aebs
//!   g : [-1..NG] init G0;        // -1 = crash, NG = escape
//!   v : [0..NV-1] init V0;
//!   a : [0..NA-1] init A0;
//!
//!   [nominal] g=3 & v=1 & a=10 -> [0.25,0.5]:(g'=2)&(v'=1)&(a'=10) + ...;
//!   [] g=-1 | g=NG -> true;
//! endmodule
//!
//! label "crash" = g=-1;
//! label "escape" = g=NG;
//! ```
//!
//! One command per (cell, action), one interval branch per successor. The
//! absorbing states park `v` and `a` at 0. Bounds are printed with `{}`,
//! which is the shortest decimal that reads back to the same `f64`, so
//! [`crate::parse::parse_model`] recovers them exactly.
//!
//! With a [`ControllerPolicy`] the output also carries one
//! `formula do_<action>` per mode and a `controller` module whose commands
//! synchronize with the plant's, enabling an action only where its formula
//! holds.
//!
//! Export refuses models whose rows cannot hold a distribution or contain
//! non-finite values; nothing is written in that case.

use core::fmt;
use std::io::Write as _;
use std::path::Path;

use aebs_core::{ControlMode, VERSION};

use crate::{
    errors::{ExportError, ExportResult},
    grid::{CellIndex, Successor},
    imdp::{coverage, Imdp, IntervalTransition, COVERAGE_TOLERANCE},
    policy::ControllerPolicy,
};

/// Name of the plant module
pub const MODULE_NAME: &str = "aebs";

/// Name of the synchronizing policy module
pub const CONTROLLER_MODULE_NAME: &str = "controller";

/// Renders an [`Imdp`] as PRISM text
#[derive(Debug, Clone, Copy)]
pub struct PrismExporter<'a> {
    imdp: &'a Imdp,
    policy: Option<&'a ControllerPolicy>,
    initial: Option<CellIndex>,
}

impl<'a> PrismExporter<'a> {
    /// Exporter with the model's own initial cell and no policy
    pub fn new(imdp: &'a Imdp) -> Self {
        Self { imdp, policy: None, initial: None }
    }

    /// Constrain actions with a controller policy
    pub fn with_policy(mut self, policy: &'a ControllerPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Override the initial cell
    pub fn with_initial(mut self, cell: CellIndex) -> Self {
        self.initial = Some(cell);
        self
    }

    /// Check every row, then render
    pub fn export(&self) -> ExportResult<String> {
        self.check()?;
        let mut out = String::with_capacity(64 * self.imdp.num_transitions() + 1024);
        self.render(&mut out).map_err(|_| ExportError::Format)?;
        Ok(out)
    }

    /// Export and write to `path` atomically
    ///
    /// The text goes to a temporary file in the target directory which is
    /// then renamed over `path`, so readers never see a partial model.
    pub fn write_model(&self, path: impl AsRef<Path>) -> ExportResult<()> {
        let path = path.as_ref();
        let text = self.export()?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(text.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| ExportError::from(e.error))?;

        log_info!("wrote {} ({} bytes)", path.display(), text.len());
        Ok(())
    }

    fn check(&self) -> ExportResult<()> {
        for (cell, action, row) in self.imdp.rows() {
            for t in row {
                for value in [t.lower, t.upper] {
                    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                        return Err(ExportError::UnrepresentableProbability {
                            cell,
                            action,
                            target: t.target,
                            value,
                        });
                    }
                }
            }
            let (lower_sum, upper_sum) = coverage(row);
            let inverted = row.iter().any(|t| t.lower > t.upper);
            if inverted
                || lower_sum > 1.0 + COVERAGE_TOLERANCE
                || upper_sum < 1.0 - COVERAGE_TOLERANCE
            {
                return Err(ExportError::Coverage { cell, action, lower_sum, upper_sum });
            }
        }
        Ok(())
    }

    fn render(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let imdp = self.imdp;
        let grid = imdp.grid();
        let (ng, nv, na) = grid.dims();
        let config = imdp.config();
        let init = self.initial.unwrap_or_else(|| imdp.initial());

        writeln!(out, "// AEBS interval MDP, aebs-imdp {}", VERSION)?;
        writeln!(
            out,
            "// profile {:?}, perception miss rate {}, dt {} s",
            config.profile, config.noise_rate, config.dt
        )?;
        writeln!(
            out,
            "// grid: gap (0, {}] / {} m, speed [0, {}) / {} m/s, accel [{}, {}) / {} m/s^2",
            grid.gap_axis().hi(),
            grid.gap_axis().resolution(),
            grid.speed_axis().hi(),
            grid.speed_axis().resolution(),
            grid.accel_axis().lo(),
            grid.accel_axis().hi(),
            grid.accel_axis().resolution(),
        )?;
        writeln!(out, "imdp")?;
        writeln!(out)?;

        if let Some(policy) = self.policy {
            render_formulas(out, policy, imdp.actions())?;
            writeln!(out)?;
        }

        writeln!(out, "module {}", MODULE_NAME)?;
        writeln!(out, "  g : [-1..{}] init {};", ng, init.gap)?;
        writeln!(out, "  v : [0..{}] init {};", nv - 1, init.speed)?;
        writeln!(out, "  a : [0..{}] init {};", na - 1, init.accel)?;
        writeln!(out)?;

        for (cell, action, row) in imdp.rows() {
            let c = grid.cell(cell);
            write!(out, "  [{}] g={} & v={} & a={} ->", action.name(), c.gap, c.speed, c.accel)?;
            for (i, t) in row.iter().enumerate() {
                let sep = if i == 0 { " " } else { " + " };
                write!(out, "{}", sep)?;
                render_branch(out, t, grid, ng)?;
            }
            writeln!(out, ";")?;
        }
        writeln!(out, "  [] g=-1 | g={} -> true;", ng)?;
        writeln!(out, "endmodule")?;
        writeln!(out)?;

        if self.policy.is_some() {
            writeln!(out, "module {}", CONTROLLER_MODULE_NAME)?;
            for action in imdp.actions() {
                writeln!(out, "  [{0}] do_{0} -> true;", action.name())?;
            }
            writeln!(out, "endmodule")?;
            writeln!(out)?;
        }

        writeln!(out, "label \"crash\" = g=-1;")?;
        writeln!(out, "label \"escape\" = g={};", ng)?;
        Ok(())
    }
}

fn render_branch(
    out: &mut impl fmt::Write,
    t: &IntervalTransition,
    grid: &crate::grid::Grid,
    ng: usize,
) -> fmt::Result {
    let (g, v, a) = match t.target {
        Successor::Crash => (-1, 0, 0),
        Successor::Escape => (ng as i64, 0, 0),
        Successor::Cell(i) => {
            let c = grid.cell(i as usize);
            (c.gap as i64, c.speed, c.accel)
        }
    };
    write!(out, "[{},{}]:(g'={})&(v'={})&(a'={})", t.lower, t.upper, g, v, a)
}

fn render_formulas(
    out: &mut impl fmt::Write,
    policy: &ControllerPolicy,
    actions: &[ControlMode],
) -> fmt::Result {
    for action in actions {
        write!(out, "formula do_{} = ", action.name())?;
        let mut any = false;
        for (g, v) in policy.columns_for(*action) {
            if any {
                write!(out, " | ")?;
            }
            write!(out, "(g={}&v={})", g, v)?;
            any = true;
        }
        if !any {
            write!(out, "false")?;
        }
        writeln!(out, ";")?;
    }
    Ok(())
}

/// Render `imdp` without a policy
pub fn export(imdp: &Imdp) -> ExportResult<String> {
    PrismExporter::new(imdp).export()
}

/// Write `imdp` without a policy to `path`, atomically
pub fn write_model(imdp: &Imdp, path: impl AsRef<Path>) -> ExportResult<()> {
    PrismExporter::new(imdp).write_model(path)
}
