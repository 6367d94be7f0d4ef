//! Platforms: fixed-size production runs.

use super::types::{Case, Priority};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered batch of cases printed together in one run.
///
/// Created once by the [`CaseGrouper`](super::CaseGrouper) and never
/// mutated afterwards. A platform always holds at least one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Position of the platform in the grouper output.
    pub id: usize,
    /// Member cases, in grouping order.
    pub cases: Vec<Case>,
}

impl Platform {
    pub fn new(id: usize, cases: Vec<Case>) -> Self {
        Self { id, cases }
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Earliest due date among the member cases.
    pub fn earliest_due(&self) -> Option<NaiveDate> {
        self.cases.iter().map(|c| c.due_date).min()
    }

    /// Number of member cases with the given priority.
    pub fn count(&self, priority: Priority) -> usize {
        self.cases.iter().filter(|c| c.priority == priority).count()
    }

    /// Case count per priority; priorities without cases are omitted.
    pub fn priority_breakdown(&self) -> BTreeMap<Priority, usize> {
        let mut breakdown = BTreeMap::new();
        for case in &self.cases {
            *breakdown.entry(case.priority).or_insert(0) += 1;
        }
        breakdown
    }

    pub fn case_ids(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.case_id.clone()).collect()
    }
}
