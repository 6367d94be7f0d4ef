//! CP variable types.

/// Handle to an integer variable inside a [`CpModel`](super::CpModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVarId(pub usize);

/// Handle to a boolean variable inside a [`CpModel`](super::CpModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoolVarId(pub usize);

/// An integer variable with a domain [min, max].
#[derive(Debug, Clone)]
pub struct IntVar {
    /// Variable name, for diagnostics.
    pub name: String,
    /// Minimum value.
    pub min: i64,
    /// Maximum value.
    pub max: i64,
}

impl IntVar {
    /// Creates a new integer variable with the given bounds.
    pub fn new(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    /// Whether `value` lies within the domain.
    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// A boolean variable (true/false decision).
#[derive(Debug, Clone)]
pub struct BoolVar {
    /// Variable name, for diagnostics.
    pub name: String,
}

impl BoolVar {
    /// Creates a new boolean variable.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A fixed-length interval anchored at an integer start variable.
///
/// Covers `[start, start + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRef {
    pub start: IntVarId,
    pub length: i64,
}

impl IntervalRef {
    pub fn new(start: IntVarId, length: i64) -> Self {
        Self { start, length }
    }
}

/// The decision variables of one schedulable task.
///
/// A task runs for `duration` and blocks its machine for `occupancy`
/// (duration plus changeover). `literals[m]` is true iff the task runs
/// on machine `m`.
#[derive(Debug, Clone)]
pub struct TaskVars {
    pub start: IntVarId,
    pub duration: i64,
    pub occupancy: i64,
    pub literals: Vec<BoolVarId>,
}
