//! Case grouping.

use super::platform::Platform;
use super::types::Case;
use crate::error::{Result, ScheduleError};
use tracing::info;

/// Partitions cases into fixed-capacity platforms.
///
/// Cases are ordered by priority rank, then due date. The sort is stable,
/// so cases that tie on both keys keep their input order and the partition
/// is reproducible. Every platform holds `capacity` cases except possibly
/// the last one.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_platform_schedule::case::{Case, CaseGrouper, Priority};
///
/// let due = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
/// let cases: Vec<Case> = (0..5)
///     .map(|i| Case::new(format!("C{i}"), Priority::Standard, due))
///     .collect();
///
/// let platforms = CaseGrouper::new(2).group(&cases).unwrap();
/// assert_eq!(platforms.len(), 3);
/// assert_eq!(platforms[2].case_count(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CaseGrouper {
    capacity: usize,
}

impl CaseGrouper {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Groups `cases` into `ceil(N / capacity)` platforms.
    pub fn group(&self, cases: &[Case]) -> Result<Vec<Platform>> {
        if cases.is_empty() {
            return Err(ScheduleError::InvalidInput("case set is empty".into()));
        }
        if self.capacity == 0 {
            return Err(ScheduleError::InvalidInput(
                "platform capacity must be positive".into(),
            ));
        }

        let mut sorted: Vec<&Case> = cases.iter().collect();
        sorted.sort_by_key(|c| (c.priority.rank(), c.due_date));

        let platforms: Vec<Platform> = sorted
            .chunks(self.capacity)
            .enumerate()
            .map(|(id, chunk)| Platform::new(id, chunk.iter().map(|&c| c.clone()).collect()))
            .collect();

        info!(
            cases = cases.len(),
            platforms = platforms.len(),
            capacity = self.capacity,
            "grouped cases into platforms"
        );
        Ok(platforms)
    }
}
