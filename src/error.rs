//! Error types.

use thiserror::Error;

/// Errors raised before or after solving.
///
/// Solver outcomes such as infeasibility or an exhausted time budget are
/// reported through [`ScheduleStatus`](crate::schedule::ScheduleStatus),
/// not through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Rejected input: empty case set, non-positive capacity, machine count,
    /// duration, or an invalid weight table.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model cannot be built, e.g. a platform does not fit the horizon.
    #[error("model construction failed: {0}")]
    ModelConstruction(String),

    /// Extraction was requested without a successful solve.
    #[error("no solution available")]
    NoSolutionAvailable,

    /// The constraint model is malformed or outside what the solver supports.
    #[error("invalid model: {0}")]
    ModelInvalid(String),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
