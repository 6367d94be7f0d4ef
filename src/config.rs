//! Scheduler configuration.

use crate::cp::SolverConfig;
use crate::error::{Result, ScheduleError};
use crate::model::PenaltyWeights;
use serde::{Deserialize, Serialize};

/// Longest accepted planning horizon: one hundred years.
pub const MAX_HORIZON_HOURS: i64 = 100 * 366 * 24;

/// Parameters of one scheduling run.
///
/// All times are whole hours. A platform occupies its machine for
/// `platform_duration_hours + turnaround_hours`.
///
/// # Examples
///
/// ```
/// use u_platform_schedule::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_machine_count(2)
///     .with_planning_horizon_hours(200);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.occupancy_hours(), 18);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of identical printers.
    pub machine_count: usize,
    /// Cases per platform.
    pub cases_per_platform: usize,
    /// Print time of one platform.
    pub platform_duration_hours: i64,
    /// Changeover time after each platform.
    pub turnaround_hours: i64,
    /// Latest schedulable hour, counted from the reference time.
    pub planning_horizon_hours: i64,
    /// Due hours assumed for platforms already past due.
    pub past_due_buffer_hours: i64,
    /// Objective weights.
    pub weights: PenaltyWeights,
    /// Solver settings.
    pub solver: SolverConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            machine_count: 50,
            cases_per_platform: 14,
            platform_duration_hours: 16,
            turnaround_hours: 2,
            planning_horizon_hours: 90 * 24,
            past_due_buffer_hours: 24,
            weights: PenaltyWeights::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_machine_count(mut self, n: usize) -> Self {
        self.machine_count = n;
        self
    }

    pub fn with_cases_per_platform(mut self, n: usize) -> Self {
        self.cases_per_platform = n;
        self
    }

    pub fn with_platform_duration_hours(mut self, hours: i64) -> Self {
        self.platform_duration_hours = hours;
        self
    }

    pub fn with_turnaround_hours(mut self, hours: i64) -> Self {
        self.turnaround_hours = hours;
        self
    }

    pub fn with_planning_horizon_hours(mut self, hours: i64) -> Self {
        self.planning_horizon_hours = hours;
        self
    }

    pub fn with_past_due_buffer_hours(mut self, hours: i64) -> Self {
        self.past_due_buffer_hours = hours;
        self
    }

    pub fn with_weights(mut self, weights: PenaltyWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_time_limit_ms(mut self, ms: i64) -> Self {
        self.solver.time_limit_ms = ms;
        self
    }

    /// Hours a platform blocks its machine.
    pub fn occupancy_hours(&self) -> i64 {
        self.platform_duration_hours.saturating_add(self.turnaround_hours)
    }

    /// Validates the configuration.
    ///
    /// A platform that does not fit the horizon is a model construction
    /// failure, reported by the model builder rather than here.
    pub fn validate(&self) -> Result<()> {
        if self.machine_count == 0 {
            return Err(ScheduleError::InvalidInput(
                "machine_count must be positive".into(),
            ));
        }
        if self.cases_per_platform == 0 {
            return Err(ScheduleError::InvalidInput(
                "cases_per_platform must be positive".into(),
            ));
        }
        if self.platform_duration_hours <= 0 {
            return Err(ScheduleError::InvalidInput(
                "platform_duration_hours must be positive".into(),
            ));
        }
        if self.turnaround_hours < 0 {
            return Err(ScheduleError::InvalidInput(
                "turnaround_hours must not be negative".into(),
            ));
        }
        if self.planning_horizon_hours <= 0 {
            return Err(ScheduleError::InvalidInput(
                "planning_horizon_hours must be positive".into(),
            ));
        }
        if self.planning_horizon_hours > MAX_HORIZON_HOURS {
            return Err(ScheduleError::InvalidInput(format!(
                "planning_horizon_hours must not exceed {MAX_HORIZON_HOURS}"
            )));
        }
        if self.past_due_buffer_hours < 0 {
            return Err(ScheduleError::InvalidInput(
                "past_due_buffer_hours must not be negative".into(),
            ));
        }
        self.weights.validate()?;
        self.solver.validate()
    }
}
