//! Case records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Urgency class of a case.
///
/// Variants are declared in rank order, so the derived `Ord` sorts
/// emergencies first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    Urgent,
    Standard,
}

impl Priority {
    /// All priorities, most urgent first.
    pub const ALL: [Priority; 3] = [Priority::Emergency, Priority::Urgent, Priority::Standard];

    /// Sort rank: emergency = 0, urgent = 1, standard = 2.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Emergency => 0,
            Priority::Urgent => 1,
            Priority::Standard => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Emergency => "emergency",
            Priority::Urgent => "urgent",
            Priority::Standard => "standard",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single print case, as delivered by the ingestion layer.
///
/// Immutable once constructed. `surgery_date` does not influence the
/// optimization; it is only used by the delivery report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub surgery_date: NaiveDate,
}

impl Case {
    /// Creates a case whose surgery date equals its due date.
    pub fn new(case_id: impl Into<String>, priority: Priority, due_date: NaiveDate) -> Self {
        Self {
            case_id: case_id.into(),
            priority,
            due_date,
            surgery_date: due_date,
        }
    }

    pub fn with_surgery_date(mut self, surgery_date: NaiveDate) -> Self {
        self.surgery_date = surgery_date;
        self
    }
}
