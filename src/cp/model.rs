//! CP model definition.

use super::variables::{BoolVar, BoolVarId, IntVar, IntVarId, IntervalRef, TaskVars};
use std::fmt;

/// A constraint in the CP model.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Exactly one of the literals is true.
    ExactlyOne {
        literals: Vec<BoolVarId>,
    },

    /// `indicator <=> (a AND b)`.
    ///
    /// Linear form: `a + b <= 1 + indicator`, `indicator <= a`,
    /// `indicator <= b`.
    BothTrue {
        indicator: BoolVarId,
        a: BoolVarId,
        b: BoolVarId,
    },

    /// Gated disjunction of two linear implications.
    ///
    /// When `gate` is true, either `first` ends before `second` starts or
    /// `second` ends before `first` starts. When `gate` is false the
    /// constraint is vacuous. Neither order is preferred.
    GatedNoOverlap {
        gate: BoolVarId,
        first: IntervalRef,
        second: IntervalRef,
    },

    /// Lower bound: `target >= source + offset`.
    AtLeast {
        target: IntVarId,
        source: IntVarId,
        offset: i64,
    },
}

/// Objective function for the CP model.
#[derive(Debug, Clone)]
pub enum Objective {
    /// Minimize a linear combination of integer variables.
    Minimize {
        /// (variable, coefficient) pairs.
        terms: Vec<(IntVarId, i64)>,
    },
}

impl Objective {
    pub fn terms(&self) -> &[(IntVarId, i64)] {
        match self {
            Objective::Minimize { terms } => terms,
        }
    }
}

/// A complete value assignment for every variable of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpAssignment {
    /// Value per integer variable, indexed by [`IntVarId`].
    pub ints: Vec<i64>,
    /// Value per boolean variable, indexed by [`BoolVarId`].
    pub bools: Vec<bool>,
}

impl CpAssignment {
    pub fn int(&self, id: IntVarId) -> i64 {
        self.ints[id.0]
    }

    pub fn bool(&self, id: BoolVarId) -> bool {
        self.bools[id.0]
    }
}

/// A constraint or domain an assignment fails to satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub message: String,
}

impl Violation {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A constraint programming model.
///
/// Variables are stored densely and addressed by [`IntVarId`] /
/// [`BoolVarId`]. Tasks group the variables a scheduling solver branches
/// on; every other integer variable is expected to be defined through
/// [`Constraint::AtLeast`] bounds.
///
/// # Examples
///
/// ```
/// use u_platform_schedule::cp::{Constraint, CpModel, IntVar, Objective};
///
/// let mut model = CpModel::new("example", 100, 1);
/// let a = model.add_task("a", 10, 12);
/// let b = model.add_task("b", 10, 12);
/// let span = model.add_int_var(IntVar::new("span", 0, 100));
/// for task in [a, b] {
///     let start = model.tasks[task].start;
///     model.add_constraint(Constraint::AtLeast { target: span, source: start, offset: 10 });
/// }
/// model.set_objective(Objective::Minimize { terms: vec![(span, 1)] });
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Planning horizon (maximum time).
    pub horizon: i64,
    /// Number of identical machines tasks can be assigned to.
    pub machine_count: usize,
    /// Integer variables.
    pub int_vars: Vec<IntVar>,
    /// Boolean variables.
    pub bool_vars: Vec<BoolVar>,
    /// Schedulable tasks.
    pub tasks: Vec<TaskVars>,
    /// Constraints.
    pub constraints: Vec<Constraint>,
    /// Objective function.
    pub objective: Option<Objective>,
}

impl CpModel {
    /// Creates a new empty model.
    pub fn new(name: impl Into<String>, horizon: i64, machine_count: usize) -> Self {
        Self {
            name: name.into(),
            horizon,
            machine_count,
            int_vars: Vec::new(),
            bool_vars: Vec::new(),
            tasks: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds an integer variable.
    pub fn add_int_var(&mut self, var: IntVar) -> IntVarId {
        self.int_vars.push(var);
        IntVarId(self.int_vars.len() - 1)
    }

    /// Adds a boolean variable.
    pub fn add_bool_var(&mut self, var: BoolVar) -> BoolVarId {
        self.bool_vars.push(var);
        BoolVarId(self.bool_vars.len() - 1)
    }

    /// Adds a task: a start variable on `[0, horizon]`, one assignment
    /// literal per machine, and the `ExactlyOne` constraint over them.
    ///
    /// Returns the task index.
    pub fn add_task(&mut self, name: &str, duration: i64, occupancy: i64) -> usize {
        let start = self.add_int_var(IntVar::new(format!("start_{name}"), 0, self.horizon));
        let literals: Vec<BoolVarId> = (0..self.machine_count)
            .map(|m| self.add_bool_var(BoolVar::new(format!("{name}_machine_{m}"))))
            .collect();
        self.constraints.push(Constraint::ExactlyOne {
            literals: literals.clone(),
        });
        self.tasks.push(TaskVars {
            start,
            duration,
            occupancy,
            literals,
        });
        self.tasks.len() - 1
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Sets the objective function.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Returns the number of integer variables.
    pub fn int_var_count(&self) -> usize {
        self.int_vars.len()
    }

    /// Returns the number of boolean variables.
    pub fn bool_var_count(&self) -> usize {
        self.bool_vars.len()
    }

    /// Returns the number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Validates the model for consistency.
    ///
    /// Checks that all referenced variables exist, domains are non-empty,
    /// and task literals match the machine count.
    pub fn validate(&self) -> Result<(), String> {
        for var in &self.int_vars {
            if var.min > var.max {
                return Err(format!("empty domain: {} [{}, {}]", var.name, var.min, var.max));
            }
        }
        for (t, task) in self.tasks.iter().enumerate() {
            self.check_int(task.start)?;
            if task.literals.len() != self.machine_count {
                return Err(format!(
                    "task {t}: {} literals for {} machines",
                    task.literals.len(),
                    self.machine_count
                ));
            }
            for &lit in &task.literals {
                self.check_bool(lit)?;
            }
            if task.duration < 0 || task.occupancy < task.duration {
                return Err(format!("task {t}: invalid duration/occupancy"));
            }
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::ExactlyOne { literals } => {
                    if literals.is_empty() {
                        return Err("exactly-one over no literals".into());
                    }
                    for &lit in literals {
                        self.check_bool(lit)?;
                    }
                }
                Constraint::BothTrue { indicator, a, b } => {
                    self.check_bool(*indicator)?;
                    self.check_bool(*a)?;
                    self.check_bool(*b)?;
                }
                Constraint::GatedNoOverlap {
                    gate,
                    first,
                    second,
                } => {
                    self.check_bool(*gate)?;
                    self.check_int(first.start)?;
                    self.check_int(second.start)?;
                }
                Constraint::AtLeast { target, source, .. } => {
                    self.check_int(*target)?;
                    self.check_int(*source)?;
                }
            }
        }
        if let Some(objective) = &self.objective {
            for &(var, _) in objective.terms() {
                self.check_int(var)?;
            }
        }
        Ok(())
    }

    fn check_int(&self, id: IntVarId) -> Result<(), String> {
        if id.0 < self.int_vars.len() {
            Ok(())
        } else {
            Err(format!("undefined int var: {}", id.0))
        }
    }

    fn check_bool(&self, id: BoolVarId) -> Result<(), String> {
        if id.0 < self.bool_vars.len() {
            Ok(())
        } else {
            Err(format!("undefined bool var: {}", id.0))
        }
    }

    /// Checks `assignment` against every domain and constraint and returns
    /// the objective value (0 without an objective).
    pub fn evaluate(&self, assignment: &CpAssignment) -> Result<i64, Violation> {
        if assignment.ints.len() != self.int_vars.len()
            || assignment.bools.len() != self.bool_vars.len()
        {
            return Err(Violation::new("assignment size does not match model"));
        }

        for (var, &value) in self.int_vars.iter().zip(&assignment.ints) {
            if !var.contains(value) {
                return Err(Violation::new(format!(
                    "{} = {value} outside [{}, {}]",
                    var.name, var.min, var.max
                )));
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::ExactlyOne { literals } => {
                    let count = literals.iter().filter(|&&l| assignment.bool(l)).count();
                    if count != 1 {
                        return Err(Violation::new(format!(
                            "exactly-one violated: {count} literals true"
                        )));
                    }
                }
                Constraint::BothTrue { indicator, a, b } => {
                    let expected = assignment.bool(*a) && assignment.bool(*b);
                    if assignment.bool(*indicator) != expected {
                        return Err(Violation::new(format!(
                            "{} does not match its conjunction",
                            self.bool_vars[indicator.0].name
                        )));
                    }
                }
                Constraint::GatedNoOverlap {
                    gate,
                    first,
                    second,
                } => {
                    if assignment.bool(*gate) {
                        let s1 = assignment.int(first.start);
                        let s2 = assignment.int(second.start);
                        if s1 + first.length > s2 && s2 + second.length > s1 {
                            return Err(Violation::new(format!(
                                "{} and {} overlap under {}",
                                self.int_vars[first.start.0].name,
                                self.int_vars[second.start.0].name,
                                self.bool_vars[gate.0].name
                            )));
                        }
                    }
                }
                Constraint::AtLeast {
                    target,
                    source,
                    offset,
                } => {
                    if assignment.int(*target) < assignment.int(*source) + offset {
                        return Err(Violation::new(format!(
                            "{} below {} + {offset}",
                            self.int_vars[target.0].name, self.int_vars[source.0].name
                        )));
                    }
                }
            }
        }

        let Some(objective) = &self.objective else {
            return Ok(0);
        };
        objective
            .terms()
            .iter()
            .try_fold(0i64, |total, &(v, c)| {
                total.checked_add(c.checked_mul(assignment.int(v))?)
            })
            .ok_or_else(|| Violation::new("objective overflows"))
    }
}
