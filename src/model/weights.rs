//! Priority-indexed penalty weights.

use crate::case::{Platform, Priority};
use crate::error::{Result, ScheduleError};
use serde::{Deserialize, Serialize};

/// One value per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTable<T> {
    pub emergency: T,
    pub urgent: T,
    pub standard: T,
}

impl<T: Copy> PriorityTable<T> {
    pub fn new(emergency: T, urgent: T, standard: T) -> Self {
        Self {
            emergency,
            urgent,
            standard,
        }
    }

    pub fn get(&self, priority: Priority) -> T {
        match priority {
            Priority::Emergency => self.emergency,
            Priority::Urgent => self.urgent,
            Priority::Standard => self.standard,
        }
    }
}

impl PriorityTable<i64> {
    /// Checks emergency >= urgent >= standard >= 0.
    fn check_monotonic(&self, name: &str) -> Result<()> {
        if self.standard < 0 {
            return Err(ScheduleError::InvalidInput(format!(
                "{name}: weights must not be negative"
            )));
        }
        if self.emergency < self.urgent || self.urgent < self.standard {
            return Err(ScheduleError::InvalidInput(format!(
                "{name}: weights must satisfy emergency >= urgent >= standard"
            )));
        }
        Ok(())
    }
}

/// Objective weights of the scheduling model.
///
/// A platform's lateness costs `platform_base` plus `platform_per_case`
/// for each member case, per hour. A case's own tardiness costs
/// `case_tardiness` per hour; priorities weighted 0 get no tardiness
/// variable.
///
/// # Examples
///
/// ```
/// use u_platform_schedule::case::Priority;
/// use u_platform_schedule::model::PenaltyWeights;
///
/// let weights = PenaltyWeights::default();
/// assert_eq!(weights.case_weight(Priority::Emergency), 100);
/// assert_eq!(weights.case_weight(Priority::Standard), 0);
/// assert!(weights.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    pub platform_base: i64,
    pub platform_per_case: PriorityTable<i64>,
    pub case_tardiness: PriorityTable<i64>,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            platform_base: 10,
            platform_per_case: PriorityTable::new(1000, 100, 0),
            case_tardiness: PriorityTable::new(100, 10, 0),
        }
    }
}

impl PenaltyWeights {
    pub fn with_platform_base(mut self, weight: i64) -> Self {
        self.platform_base = weight;
        self
    }

    pub fn with_platform_per_case(mut self, table: PriorityTable<i64>) -> Self {
        self.platform_per_case = table;
        self
    }

    pub fn with_case_tardiness(mut self, table: PriorityTable<i64>) -> Self {
        self.case_tardiness = table;
        self
    }

    /// Lateness weight of a platform, per hour, or `None` if it does not
    /// fit in an `i64`.
    pub fn platform_weight(&self, platform: &Platform) -> Option<i64> {
        Priority::ALL.iter().try_fold(self.platform_base, |total, &priority| {
            let count = i64::try_from(platform.count(priority)).ok()?;
            total.checked_add(self.platform_per_case.get(priority).checked_mul(count)?)
        })
    }

    /// Tardiness weight of a single case, per hour.
    pub fn case_weight(&self, priority: Priority) -> i64 {
        self.case_tardiness.get(priority)
    }

    /// Whether cases of `priority` carry a tardiness variable.
    pub fn tracks(&self, priority: Priority) -> bool {
        self.case_weight(priority) > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform_base < 0 {
            return Err(ScheduleError::InvalidInput(
                "platform_base must not be negative".into(),
            ));
        }
        self.platform_per_case.check_monotonic("platform_per_case")?;
        self.case_tardiness.check_monotonic("case_tardiness")?;
        Ok(())
    }
}
