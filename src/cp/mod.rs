//! Constraint Programming (CP) layer.
//!
//! A small modeling layer for machine-assignment problems plus an exact
//! solver for them.
//!
//! # Key Components
//!
//! - **Variables**: [`IntVar`], [`BoolVar`], [`TaskVars`] (start, duration,
//!   occupancy and one assignment literal per machine)
//! - **Constraints**: [`Constraint`]: exactly-one, conjunction indicators,
//!   gated no-overlap, lower bounds
//! - **Model**: [`CpModel`]: container for variables, constraints, objective
//! - **Solver**: [`CpSolver`] trait, implemented by [`BranchAndBoundSolver`]
//!
//! # Design
//!
//! The model is generic: it knows nothing about platforms or cases. The
//! builder in [`crate::model`] translates a scheduling instance into it.
//! The solver compiles the model into a dispatch problem and rejects
//! structures outside what it can prove optimal, so any assignment it
//! returns is checked against the full model with [`CpModel::evaluate`].
//!
//! # References
//!
//! Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

mod model;
mod search;
mod solver;
mod variables;

pub use model::{Constraint, CpAssignment, CpModel, Objective, Violation};
pub use solver::{BranchAndBoundSolver, CpSolution, CpSolver, SolverConfig, SolverStatus};
pub use variables::{BoolVar, BoolVarId, IntVar, IntVarId, IntervalRef, TaskVars};
