//! Reader for the exported PRISM text
//!
//! Accepts exactly the subset [`crate::export`] writes: `//` comments, the
//! `imdp` header, optional `formula do_<action>` lines, the plant module
//! with its three variable declarations and guarded commands, an optional
//! controller module, and labels. Anything else is a [`ParseError`] naming
//! the line.

use aebs_core::ControlMode;

use crate::{
    errors::{ParseError, ParseResult},
    export::{CONTROLLER_MODULE_NAME, MODULE_NAME},
    grid::{CellIndex, Successor},
    imdp::IntervalTransition,
};

/// One `[action] guard -> branches;` command
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    /// Action label
    pub action: ControlMode,
    /// Source cell from the guard
    pub cell: CellIndex,
    /// Branches in file order
    pub transitions: Vec<IntervalTransition>,
}

/// Structure recovered from model text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedModel {
    /// Bins per variable `(g, v, a)`
    pub dims: (usize, usize, usize),
    /// Initial cell
    pub initial: CellIndex,
    /// Plant commands in file order
    pub commands: Vec<ParsedCommand>,
    /// `(gap, speed)` columns listed in each `do_<action>` formula
    pub policy: Vec<(ControlMode, Vec<(usize, usize)>)>,
    /// Label names and their right-hand sides
    pub labels: Vec<(String, String)>,
}

impl ParsedModel {
    /// Flat index of a cell under the parsed dimensions
    pub fn flat(&self, cell: CellIndex) -> usize {
        let (_, nv, na) = self.dims;
        (cell.gap * nv + cell.speed) * na + cell.accel
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Plant,
    Controller,
    Labels,
}

/// Parse a model produced by the exporter
pub fn parse_model(text: &str) -> ParseResult<ParsedModel> {
    let mut model = ParsedModel::default();
    let mut section = Section::Preamble;
    let mut header = false;
    let mut declared = [false; 3];

    for (i, raw) in text.lines().enumerate() {
        let n = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if !header {
            if line != "imdp" {
                return Err(ParseError::at(n, "expected `imdp` header"));
            }
            header = true;
            continue;
        }

        match section {
            Section::Preamble | Section::Labels => {
                if let Some(rest) = line.strip_prefix("formula ") {
                    if section == Section::Labels {
                        return Err(ParseError::at(n, "formula after modules"));
                    }
                    model.policy.push(parse_formula(n, rest)?);
                } else if let Some(name) = line.strip_prefix("module ") {
                    section = match name.trim() {
                        MODULE_NAME => Section::Plant,
                        CONTROLLER_MODULE_NAME => Section::Controller,
                        _ => return Err(ParseError::at(n, "unknown module")),
                    };
                } else if let Some(rest) = line.strip_prefix("label ") {
                    model.labels.push(parse_label(n, rest)?);
                    section = Section::Labels;
                } else {
                    return Err(ParseError::at(n, "unexpected top-level line"));
                }
            }
            Section::Plant => {
                if line == "endmodule" {
                    if declared != [true; 3] {
                        return Err(ParseError::at(n, "module ends before all variables are declared"));
                    }
                    section = Section::Labels;
                } else if line.starts_with("[]") {
                    // absorbing crash/escape command
                } else if line.starts_with('[') {
                    if declared != [true; 3] {
                        return Err(ParseError::at(n, "command before variable declarations"));
                    }
                    let command = parse_command(n, line, &model)?;
                    model.commands.push(command);
                } else {
                    parse_declaration(n, line, &mut model, &mut declared)?;
                }
            }
            Section::Controller => {
                if line == "endmodule" {
                    section = Section::Labels;
                } else if !(line.starts_with('[') && line.ends_with("-> true;")) {
                    return Err(ParseError::at(n, "malformed controller command"));
                }
            }
        }
    }

    if !header {
        return Err(ParseError::at(1, "empty model"));
    }
    if section == Section::Plant || section == Section::Controller {
        return Err(ParseError::at(text.lines().count(), "missing endmodule"));
    }
    Ok(model)
}

fn parse_usize(n: usize, s: &str) -> ParseResult<usize> {
    s.trim().parse().map_err(|_| ParseError::at(n, "expected a non-negative integer"))
}

fn parse_int(n: usize, s: &str) -> ParseResult<i64> {
    s.trim().parse().map_err(|_| ParseError::at(n, "expected an integer"))
}

fn parse_action(n: usize, name: &str) -> ParseResult<ControlMode> {
    ControlMode::from_name(name.trim()).ok_or(ParseError::at(n, "unknown action"))
}

/// `g : [-1..NG] init G0;`
fn parse_declaration(
    n: usize,
    line: &str,
    model: &mut ParsedModel,
    declared: &mut [bool; 3],
) -> ParseResult<()> {
    let body = line.strip_suffix(';').ok_or(ParseError::at(n, "missing `;`"))?;
    let (var, rest) = body.split_once(':').ok_or(ParseError::at(n, "expected `name : [lo..hi] init x`"))?;
    let (range, init) = rest.split_once("init").ok_or(ParseError::at(n, "missing init"))?;
    let range = range
        .trim()
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .ok_or(ParseError::at(n, "malformed range"))?;
    let (lo, hi) = range.split_once("..").ok_or(ParseError::at(n, "malformed range"))?;
    let (lo, hi, init) = (parse_int(n, lo)?, parse_int(n, hi)?, parse_int(n, init)?);
    if init < lo || init > hi {
        return Err(ParseError::at(n, "init outside range"));
    }

    let slot = match var.trim() {
        "g" if lo == -1 && hi >= 1 => {
            model.dims.0 = hi as usize;
            model.initial.gap = init as usize;
            0
        }
        "v" if lo == 0 && hi >= 0 => {
            model.dims.1 = hi as usize + 1;
            model.initial.speed = init as usize;
            1
        }
        "a" if lo == 0 && hi >= 0 => {
            model.dims.2 = hi as usize + 1;
            model.initial.accel = init as usize;
            2
        }
        _ => return Err(ParseError::at(n, "unexpected variable declaration")),
    };
    if declared[slot] {
        return Err(ParseError::at(n, "variable declared twice"));
    }
    declared[slot] = true;
    if slot == 0 && init < 0 {
        return Err(ParseError::at(n, "initial state is absorbing"));
    }
    Ok(())
}

/// `[action] g=I & v=J & a=K -> [lo,hi]:(g'=..)&(v'=..)&(a'=..) + ...;`
fn parse_command(n: usize, line: &str, model: &ParsedModel) -> ParseResult<ParsedCommand> {
    let body = line.strip_suffix(';').ok_or(ParseError::at(n, "missing `;`"))?;
    let (label, rest) = body[1..].split_once(']').ok_or(ParseError::at(n, "unclosed action label"))?;
    let action = parse_action(n, label)?;
    let (guard, updates) = rest.split_once("->").ok_or(ParseError::at(n, "missing `->`"))?;

    let [g, v, a] = parse_assignments(n, guard, '&', "")?;
    let cell = to_cell(n, model, g, v, a)?;

    let transitions = updates
        .split(" + ")
        .map(|branch| parse_branch(n, branch, model))
        .collect::<ParseResult<Vec<_>>>()?;
    if transitions.is_empty() {
        return Err(ParseError::at(n, "command without branches"));
    }
    Ok(ParsedCommand { action, cell, transitions })
}

/// `[lo,hi]:(g'=..)&(v'=..)&(a'=..)`
fn parse_branch(n: usize, branch: &str, model: &ParsedModel) -> ParseResult<IntervalTransition> {
    let branch = branch.trim();
    let (bounds, update) = branch
        .strip_prefix('[')
        .and_then(|b| b.split_once("]:"))
        .ok_or(ParseError::at(n, "malformed probability interval"))?;
    let (lower, upper) = bounds.split_once(',').ok_or(ParseError::at(n, "malformed probability interval"))?;
    let lower: f64 = lower.trim().parse().map_err(|_| ParseError::at(n, "malformed probability"))?;
    let upper: f64 = upper.trim().parse().map_err(|_| ParseError::at(n, "malformed probability"))?;

    let [g, v, a] = parse_assignments(n, update, '&', "'")?;
    let (ng, _, _) = model.dims;
    let target = if g == -1 {
        Successor::Crash
    } else if g == ng as i64 {
        Successor::Escape
    } else {
        Successor::Cell(model.flat(to_cell(n, model, g, v, a)?) as u32)
    };
    Ok(IntervalTransition { target, lower, upper })
}

/// `x=1 & y=2 & z=3` (guards) or `(x'=1)&(y'=2)&(z'=3)` (updates), in g, v, a order
fn parse_assignments(n: usize, s: &str, sep: char, prime: &str) -> ParseResult<[i64; 3]> {
    let mut out = [0i64; 3];
    let mut parts = s.split(sep);
    for (slot, var) in ["g", "v", "a"].into_iter().enumerate() {
        let part = parts.next().ok_or(ParseError::at(n, "expected g, v and a"))?;
        let part = part.trim().trim_start_matches('(').trim_end_matches(')');
        let (lhs, rhs) = part.split_once('=').ok_or(ParseError::at(n, "expected an assignment"))?;
        if lhs.trim().strip_suffix(prime) != Some(var) {
            return Err(ParseError::at(n, "variables out of order"));
        }
        out[slot] = parse_int(n, rhs)?;
    }
    if parts.next().is_some() {
        return Err(ParseError::at(n, "too many assignments"));
    }
    Ok(out)
}

fn to_cell(n: usize, model: &ParsedModel, g: i64, v: i64, a: i64) -> ParseResult<CellIndex> {
    let (ng, nv, na) = model.dims;
    let inside = |x: i64, len: usize| x >= 0 && (x as usize) < len;
    if inside(g, ng) && inside(v, nv) && inside(a, na) {
        Ok(CellIndex { gap: g as usize, speed: v as usize, accel: a as usize })
    } else {
        Err(ParseError::at(n, "cell outside declared ranges"))
    }
}

/// `do_<action> = (g=I&v=J) | ... ;` or `do_<action> = false;`
fn parse_formula(n: usize, rest: &str) -> ParseResult<(ControlMode, Vec<(usize, usize)>)> {
    let body = rest.trim().strip_suffix(';').ok_or(ParseError::at(n, "missing `;`"))?;
    let (name, expr) = body.split_once('=').ok_or(ParseError::at(n, "malformed formula"))?;
    let action = name
        .trim()
        .strip_prefix("do_")
        .ok_or(ParseError::at(n, "formula is not a policy formula"))?;
    let action = parse_action(n, action)?;

    let expr = expr.trim();
    if expr == "false" {
        return Ok((action, Vec::new()));
    }
    let mut columns = Vec::new();
    for term in expr.split('|') {
        let term = term.trim().trim_start_matches('(').trim_end_matches(')');
        let (g, v) = term.split_once('&').ok_or(ParseError::at(n, "malformed policy term"))?;
        let g = g.trim().strip_prefix("g=").ok_or(ParseError::at(n, "malformed policy term"))?;
        let v = v.trim().strip_prefix("v=").ok_or(ParseError::at(n, "malformed policy term"))?;
        columns.push((parse_usize(n, g)?, parse_usize(n, v)?));
    }
    Ok((action, columns))
}

/// `"name" = expr;`
fn parse_label(n: usize, rest: &str) -> ParseResult<(String, String)> {
    let body = rest.trim().strip_suffix(';').ok_or(ParseError::at(n, "missing `;`"))?;
    let (name, expr) = body.split_once('=').ok_or(ParseError::at(n, "malformed label"))?;
    let name = name
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(ParseError::at(n, "label name must be quoted"))?;
    Ok((name.to_string(), expr.trim().to_string()))
}
