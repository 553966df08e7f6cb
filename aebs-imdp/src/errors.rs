//! Abstraction, export and parse errors
//!
//! All three enums are `Copy`: cells are flat indices, actions are
//! [`ControlMode`]s and I/O failures keep only their [`std::io::ErrorKind`].

use aebs_core::{ConfigError, ControlMode};
use thiserror_no_std::Error;

use crate::grid::Successor;

/// Result type for building and checking an IMDP
pub type AbstractionResult<T> = Result<T, AbstractionError>;

/// Result type for exporting an IMDP
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for re-parsing an exported model
pub type ParseResult<T> = Result<T, ParseError>;

/// Failures while building or checking an IMDP
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AbstractionError {
    /// Rejected configuration
    #[error("invalid configuration: {0}")]
    Config(ConfigError),

    /// The bounds of one (cell, action) cannot contain a distribution
    #[error("coverage violated at cell {cell}, action {action}: sum lower = {lower_sum}, sum upper = {upper_sum}")]
    CoverageViolation {
        /// Flat cell index
        cell: usize,
        /// Action of the row
        action: ControlMode,
        /// Sum of the lower bounds
        lower_sum: f64,
        /// Sum of the upper bounds
        upper_sum: f64,
    },

    /// A single interval is not a sub-interval of [0, 1]
    #[error("invalid interval [{lower}, {upper}] at cell {cell}, action {action}, target {target}")]
    InvalidInterval {
        /// Flat cell index
        cell: usize,
        /// Action of the row
        action: ControlMode,
        /// Offending successor
        target: Successor,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Row count does not match cells × actions
    #[error("expected {expected} rows, found {found}")]
    Shape {
        /// cells × actions
        expected: usize,
        /// Rows supplied
        found: usize,
    },
}

impl From<ConfigError> for AbstractionError {
    fn from(err: ConfigError) -> Self {
        AbstractionError::Config(err)
    }
}

/// Failures while producing the PRISM artifact
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ExportError {
    /// A row's bounds cannot contain a distribution
    #[error("cannot export: coverage violated at cell {cell}, action {action} (sum lower = {lower_sum}, sum upper = {upper_sum})")]
    Coverage {
        /// Flat cell index
        cell: usize,
        /// Action of the row
        action: ControlMode,
        /// Sum of the lower bounds
        lower_sum: f64,
        /// Sum of the upper bounds
        upper_sum: f64,
    },

    /// NaN, infinity or a value outside [0, 1]
    #[error("cannot export probability {value} at cell {cell}, action {action}, target {target}")]
    UnrepresentableProbability {
        /// Flat cell index
        cell: usize,
        /// Action of the row
        action: ControlMode,
        /// Successor of the offending transition
        target: Successor,
        /// Offending value
        value: f64,
    },

    /// Writing the text into memory failed
    #[error("formatting the model failed")]
    Format,

    /// Writing or renaming the output file failed
    #[error("i/o error: {kind:?}")]
    Io {
        /// Category of the underlying error
        kind: std::io::ErrorKind,
    },
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io { kind: err.kind() }
    }
}

/// Malformed model text
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line number
    pub line: usize,
    /// What was wrong
    pub reason: &'static str,
}

impl ParseError {
    pub(crate) fn at(line: usize, reason: &'static str) -> Self {
        Self { line, reason }
    }
}
