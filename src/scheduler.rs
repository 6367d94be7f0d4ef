//! End-to-end scheduling pipeline.

use crate::case::{Case, CaseGrouper, Platform};
use crate::config::SchedulerConfig;
use crate::cp::{BranchAndBoundSolver, CpSolver};
use crate::error::{Result, ScheduleError};
use crate::model::ScheduleModelBuilder;
use crate::schedule::{Schedule, ScheduleStatus, SolutionExtractor};
use chrono::NaiveDateTime;
use tracing::info;

/// Groups cases, builds the model, solves it and extracts the schedule.
///
/// Each call builds a fresh model; nothing is kept between calls.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_platform_schedule::case::{Case, Priority};
/// use u_platform_schedule::{PlatformScheduler, ScheduleStatus, SchedulerConfig};
///
/// let now = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let due = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
/// let cases: Vec<Case> = (0..20)
///     .map(|i| Case::new(format!("C{i}"), Priority::Standard, due))
///     .collect();
///
/// let config = SchedulerConfig::default()
///     .with_machine_count(2)
///     .with_planning_horizon_hours(200)
///     .with_time_limit_ms(5_000);
/// let schedule = PlatformScheduler::new(config).schedule(&cases, now).unwrap();
/// assert_eq!(schedule.status, ScheduleStatus::Optimal);
/// assert_eq!(schedule.platform_assignments.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PlatformScheduler<S = BranchAndBoundSolver> {
    config: SchedulerConfig,
    solver: S,
}

impl PlatformScheduler<BranchAndBoundSolver> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_solver(config, BranchAndBoundSolver::new())
    }
}

impl<S: CpSolver> PlatformScheduler<S> {
    pub fn with_solver(config: SchedulerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedules `cases` relative to `reference_time`.
    ///
    /// Infeasible and timed-out runs return a [`Schedule`] with that
    /// status and no assignments.
    pub fn schedule(&self, cases: &[Case], reference_time: NaiveDateTime) -> Result<Schedule> {
        self.config.validate()?;
        let platforms = CaseGrouper::new(self.config.cases_per_platform).group(cases)?;
        self.schedule_platforms(&platforms, reference_time)
    }

    /// Schedules already grouped platforms.
    pub fn schedule_platforms(
        &self,
        platforms: &[Platform],
        reference_time: NaiveDateTime,
    ) -> Result<Schedule> {
        let model = ScheduleModelBuilder::new(platforms, &self.config, reference_time).build()?;
        let solution = self.solver.solve(&model.cp, &self.config.solver);

        let Some(status) = ScheduleStatus::from_solver(solution.status) else {
            return Err(ScheduleError::ModelInvalid(
                solution
                    .message
                    .unwrap_or_else(|| "solver rejected the model".into()),
            ));
        };

        let schedule = if status.has_solution() {
            SolutionExtractor::new(&model).extract(&solution)?
        } else {
            Schedule::unsolved(
                status,
                solution.solve_time_ms as f64 / 1000.0,
                platforms,
                model.past_due_platforms(),
            )
        };

        info!(
            status = ?schedule.status,
            objective = ?schedule.objective_value,
            platforms = schedule.summary.total_platforms,
            machines_used = schedule.summary.machines_used,
            past_due = schedule.past_due_platforms.len(),
            solve_time_seconds = schedule.solve_time_seconds,
            "scheduling finished"
        );
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Priority;
    use crate::cp::{CpModel, CpSolution, SolverConfig, SolverStatus};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn cases(n: usize) -> Vec<Case> {
        let due = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        (0..n)
            .map(|i| Case::new(format!("C{i}"), Priority::Standard, due))
            .collect()
    }

    struct Rejecting;

    impl CpSolver for Rejecting {
        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::empty(SolverStatus::ModelInvalid)
        }
    }

    struct GivingUp;

    impl CpSolver for GivingUp {
        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::empty(SolverStatus::TimeoutNoSolution)
        }
    }

    fn small_config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_machine_count(2)
            .with_planning_horizon_hours(200)
    }

    #[test]
    fn test_empty_cases_rejected() {
        let result = PlatformScheduler::new(small_config()).schedule(&[], now());
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = small_config().with_cases_per_platform(0);
        let result = PlatformScheduler::new(config).schedule(&cases(3), now());
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_rejected_model_is_an_error() {
        let scheduler = PlatformScheduler::with_solver(small_config(), Rejecting);
        let result = scheduler.schedule(&cases(3), now());
        assert!(matches!(result, Err(ScheduleError::ModelInvalid(_))));
    }

    #[test]
    fn test_timeout_is_a_status() {
        let scheduler = PlatformScheduler::with_solver(small_config(), GivingUp);
        let schedule = scheduler.schedule(&cases(30), now()).unwrap();
        assert_eq!(schedule.status, ScheduleStatus::TimeoutNoSolution);
        assert!(schedule.platform_assignments.is_empty());
        assert_eq!(schedule.summary.total_platforms, 3);
        assert_eq!(schedule.summary.total_cases, 30);
    }
}
