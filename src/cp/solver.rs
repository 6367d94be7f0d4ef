//! CP solver interface and the branch-and-bound implementation.

use super::model::{Constraint, CpAssignment, CpModel};
use super::search::{self, Placements, SearchProblem, SharedIncumbent};
use crate::error::{Result, ScheduleError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Status of the solver after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// Proven optimal solution found.
    Optimal,
    /// Feasible solution found, optimality not proven within the budget.
    Feasible,
    /// Proven that no assignment satisfies the hard constraints.
    Infeasible,
    /// Budget exhausted before any feasible assignment was found.
    TimeoutNoSolution,
    /// Model is invalid or outside what the solver supports.
    ModelInvalid,
}

/// Solution from a CP solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    /// Solver status.
    pub status: SolverStatus,
    /// Objective value of the returned assignment.
    pub objective_value: Option<i64>,
    /// Value of every model variable, present iff a solution was found.
    pub assignment: Option<CpAssignment>,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
    /// Search nodes explored.
    pub nodes_explored: u64,
    /// Reason the model was rejected, for `ModelInvalid`.
    pub message: Option<String>,
}

impl CpSolution {
    /// Creates an empty solution with the given status.
    pub fn empty(status: SolverStatus) -> Self {
        Self {
            status,
            objective_value: None,
            assignment: None,
            solve_time_ms: 0,
            nodes_explored: 0,
            message: None,
        }
    }

    fn invalid(message: String, started: Instant) -> Self {
        Self {
            message: Some(message),
            solve_time_ms: elapsed_ms(started),
            ..Self::empty(SolverStatus::ModelInvalid)
        }
    }

    /// Whether a feasible solution was found.
    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    /// The assignment of a successful solve.
    pub fn solved_assignment(&self) -> Result<&CpAssignment> {
        match (&self.assignment, self.is_solution_found()) {
            (Some(assignment), true) => Ok(assignment),
            _ => Err(ScheduleError::NoSolutionAvailable),
        }
    }
}

/// Solver configuration.
///
/// # Examples
///
/// ```
/// use u_platform_schedule::cp::SolverConfig;
///
/// let config = SolverConfig::default()
///     .with_time_limit_ms(5_000)
///     .with_num_workers(4)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum solve time in milliseconds.
    pub time_limit_ms: i64,
    /// Number of parallel workers.
    pub num_workers: usize,
    /// Stop after finding the first feasible solution.
    pub stop_after_first: bool,
    /// Seed for the warm-start swap descent.
    pub seed: Option<u64>,
    /// Swap attempts spent improving the greedy warm start.
    pub warm_start_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            num_workers: 1,
            stop_after_first: false,
            seed: None,
            warm_start_iterations: 2_000,
        }
    }
}

impl SolverConfig {
    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn with_stop_after_first(mut self, stop: bool) -> Self {
        self.stop_after_first = stop;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_warm_start_iterations(mut self, n: usize) -> Self {
        self.warm_start_iterations = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.time_limit_ms < 0 {
            return Err(ScheduleError::InvalidInput(
                "time_limit_ms must not be negative".into(),
            ));
        }
        if self.num_workers == 0 {
            return Err(ScheduleError::InvalidInput(
                "num_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Trait for CP solver implementations.
///
/// Implementors must always return within a small constant of
/// `config.time_limit_ms` and never panic on a malformed model.
pub trait CpSolver {
    /// Solves the model and returns a solution.
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution;
}

/// Exact solver for disjunctive machine-assignment models.
///
/// Accepts models whose tasks each pick one machine through
/// `ExactlyOne` literals, whose every task pair is separated on every
/// machine by a `GatedNoOverlap` over a `BothTrue` indicator, and whose
/// remaining integer variables are `AtLeast` bounds on task starts
/// weighted non-negatively in a minimization objective.
///
/// See the `search` module docs for the algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        let started = Instant::now();
        let deadline = started + Duration::from_millis(config.time_limit_ms.max(0) as u64);

        let problem = match SearchProblem::from_model(model) {
            Ok(problem) => problem,
            Err(message) => {
                error!(model = %model.name, %message, "model rejected by solver");
                return CpSolution::invalid(message, started);
            }
        };

        let shared = SharedIncumbent::new(config.stop_after_first);
        search::warm_start(&problem, config, &shared, deadline);
        search::branch_and_bound(&problem, &shared, deadline, config.num_workers.max(1));

        let timed_out = shared.timed_out();
        let interrupted = shared.interrupted();
        let nodes = shared.nodes();
        let improvements = shared.improvements();
        debug!(nodes, improvements, timed_out, "search finished");

        let Some((cost, placements)) = shared.into_best() else {
            let status = if timed_out {
                SolverStatus::TimeoutNoSolution
            } else {
                SolverStatus::Infeasible
            };
            info!(model = %model.name, ?status, nodes, "no solution");
            return CpSolution {
                solve_time_ms: elapsed_ms(started),
                nodes_explored: nodes,
                ..CpSolution::empty(status)
            };
        };

        let assignment = build_assignment(model, &problem, &placements);
        let objective = match model.evaluate(&assignment) {
            Ok(value) => value,
            Err(violation) => {
                error!(model = %model.name, %violation, "incumbent violates the model");
                return CpSolution::invalid(violation.to_string(), started);
            }
        };
        let objective = match reconcile(objective, cost) {
            Ok(value) => value,
            Err(message) => {
                error!(model = %model.name, objective, cost, "objective mismatch");
                return CpSolution::invalid(message, started);
            }
        };

        let status = if interrupted {
            SolverStatus::Feasible
        } else {
            SolverStatus::Optimal
        };
        info!(
            model = %model.name,
            ?status,
            objective,
            nodes,
            elapsed_ms = elapsed_ms(started),
            "solve finished"
        );

        CpSolution {
            status,
            objective_value: Some(objective),
            assignment: Some(assignment),
            solve_time_ms: elapsed_ms(started),
            nodes_explored: nodes,
            message: None,
        }
    }
}

/// Expands task placements into a value for every model variable.
fn build_assignment(model: &CpModel, problem: &SearchProblem, placements: &Placements) -> CpAssignment {
    let mut ints: Vec<i64> = model.int_vars.iter().map(|v| v.min).collect();
    for (var, value) in problem.int_values(placements) {
        ints[var.0] = value;
    }

    let mut bools = vec![false; model.bool_vars.len()];
    for (task, &(_, machine)) in model.tasks.iter().zip(placements) {
        if let Some(lit) = task.literals.get(machine) {
            bools[lit.0] = true;
        }
    }
    for constraint in &model.constraints {
        if let Constraint::BothTrue { indicator, a, b } = constraint {
            bools[indicator.0] = bools[a.0] && bools[b.0];
        }
    }

    CpAssignment { ints, bools }
}

/// Accepts the re-evaluated objective only if it equals the search cost.
fn reconcile(objective: i64, cost: i64) -> std::result::Result<i64, String> {
    if objective == cost {
        Ok(objective)
    } else {
        Err(format!(
            "model objective {objective} differs from search cost {cost}"
        ))
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}
