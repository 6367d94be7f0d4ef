//! Mapping solver assignments back to platforms.

use super::types::{
    average, MachineSlot, PlatformAssignment, Schedule, ScheduleStatus, ScheduleSummary,
};
use crate::cp::CpSolution;
use crate::error::{Result, ScheduleError};
use crate::model::PlatformModel;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Builds a [`Schedule`] from a solved [`PlatformModel`].
///
/// Extraction reads the solution only, so extracting the same solution
/// twice yields identical schedules.
#[derive(Debug, Clone, Copy)]
pub struct SolutionExtractor<'a> {
    model: &'a PlatformModel,
}

impl<'a> SolutionExtractor<'a> {
    pub fn new(model: &'a PlatformModel) -> Self {
        Self { model }
    }

    /// Extracts the schedule of an `OPTIMAL` or `FEASIBLE` solution.
    ///
    /// Fails with [`ScheduleError::NoSolutionAvailable`] for any other
    /// solution.
    pub fn extract(&self, solution: &CpSolution) -> Result<Schedule> {
        let assignment = solution.solved_assignment()?;
        let status = ScheduleStatus::from_solver(solution.status)
            .filter(|s| s.has_solution())
            .ok_or(ScheduleError::NoSolutionAvailable)?;
        let model = self.model;
        if assignment.ints.len() != model.cp.int_var_count()
            || assignment.bools.len() != model.cp.bool_var_count()
        {
            return Err(ScheduleError::ModelInvalid(
                "solution does not belong to this model".into(),
            ));
        }

        let duration = model.duration_hours;
        let mut platform_assignments = Vec::with_capacity(model.platforms.len());
        let mut machine_utilization: BTreeMap<usize, Vec<MachineSlot>> = BTreeMap::new();

        for (platform, vars) in model.platforms.iter().zip(&model.platform_vars) {
            let machine = vars
                .literals
                .iter()
                .position(|&lit| assignment.bool(lit))
                .ok_or_else(|| {
                    ScheduleError::ModelInvalid(format!("platform {} has no machine", platform.id))
                })?;
            let start = assignment.int(vars.start);
            let end = start.checked_add(duration).ok_or_else(|| out_of_range(platform.id))?;
            let start_time =
                offset(model.reference_time, start).ok_or_else(|| out_of_range(platform.id))?;
            let end_time =
                offset(model.reference_time, end).ok_or_else(|| out_of_range(platform.id))?;

            platform_assignments.push(PlatformAssignment {
                platform_id: platform.id,
                assigned_machine: machine,
                start_time,
                end_time,
                duration_hours: duration,
                num_cases: platform.case_count(),
                cases: platform.case_ids(),
                priority_breakdown: platform.priority_breakdown(),
            });
            machine_utilization
                .entry(machine)
                .or_default()
                .push(MachineSlot {
                    platform_id: platform.id,
                    start,
                    end,
                });
        }

        for slots in machine_utilization.values_mut() {
            slots.sort_by_key(|s| (s.start, s.platform_id));
        }

        let machines_used = platform_assignments
            .iter()
            .map(|a| a.assigned_machine)
            .collect::<BTreeSet<_>>()
            .len();
        let total_cases: usize = platform_assignments.iter().map(|a| a.num_cases).sum();
        let latest_end = assignment.int(model.makespan);

        let summary = ScheduleSummary {
            total_platforms: platform_assignments.len(),
            total_cases,
            machines_used,
            utilization_rate: average(machines_used, model.machine_count),
            avg_cases_per_platform: average(total_cases, platform_assignments.len()),
            planning_horizon_hours: latest_end,
        };
        debug!(
            platforms = summary.total_platforms,
            machines_used, latest_end, "extracted schedule"
        );

        Ok(Schedule {
            status,
            objective_value: solution.objective_value,
            solve_time_seconds: solution.solve_time_ms as f64 / 1000.0,
            platform_assignments,
            machine_utilization,
            summary,
            past_due_platforms: model.past_due_platforms(),
        })
    }
}

/// `reference` shifted by `hours`, or `None` past the calendar's range.
fn offset(reference: NaiveDateTime, hours: i64) -> Option<NaiveDateTime> {
    TimeDelta::try_hours(hours).and_then(|span| reference.checked_add_signed(span))
}

fn out_of_range(platform: usize) -> ScheduleError {
    ScheduleError::ModelInvalid(format!("platform {platform} starts outside the calendar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Case, Platform, Priority};
    use crate::config::SchedulerConfig;
    use crate::cp::{BranchAndBoundSolver, CpSolver, SolverStatus};
    use crate::model::ScheduleModelBuilder;
    use chrono::{NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn solved(machines: usize, platform_count: usize) -> (PlatformModel, CpSolution) {
        let due = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
        let platforms: Vec<Platform> = (0..platform_count)
            .map(|id| {
                Platform::new(
                    id,
                    vec![
                        Case::new(format!("E{id}"), Priority::Emergency, due),
                        Case::new(format!("S{id}"), Priority::Standard, due),
                    ],
                )
            })
            .collect();
        let config = SchedulerConfig::default()
            .with_machine_count(machines)
            .with_planning_horizon_hours(200)
            .with_time_limit_ms(10_000);
        let model = ScheduleModelBuilder::new(&platforms, &config, now())
            .build()
            .unwrap();
        let solution = BranchAndBoundSolver::new().solve(&model.cp, &config.solver);
        (model, solution)
    }

    #[test]
    fn test_extract_parallel_platforms() {
        let (model, solution) = solved(3, 2);
        assert_eq!(solution.status, SolverStatus::Optimal);
        let schedule = SolutionExtractor::new(&model).extract(&solution).unwrap();

        assert_eq!(schedule.status, ScheduleStatus::Optimal);
        assert_eq!(schedule.objective_value, Some(16));
        assert_eq!(schedule.platform_assignments.len(), 2);
        assert_eq!(schedule.summary.machines_used, 2);
        assert!((schedule.summary.utilization_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(schedule.summary.total_cases, 4);
        assert_eq!(schedule.summary.avg_cases_per_platform, 2.0);
        assert_eq!(schedule.summary.planning_horizon_hours, 16);

        let first = &schedule.platform_assignments[0];
        assert_eq!(first.start_time, now());
        assert_eq!(first.end_time, now() + TimeDelta::hours(16));
        assert_eq!(first.duration_hours, 16);
        assert_eq!(first.cases, vec!["E0", "S0"]);
        assert_eq!(first.priority_breakdown.get(&Priority::Emergency), Some(&1));
    }

    #[test]
    fn test_machine_utilization_ordered() {
        let (model, solution) = solved(1, 3);
        let schedule = SolutionExtractor::new(&model).extract(&solution).unwrap();

        let slots = &schedule.machine_utilization[&0];
        assert_eq!(slots.len(), 3);
        let starts: Vec<i64> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 18, 36]);
        assert!(slots.iter().all(|s| s.end == s.start + 16));
        assert_eq!(schedule.summary.planning_horizon_hours, 52);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let (model, solution) = solved(2, 3);
        let extractor = SolutionExtractor::new(&model);
        let first = extractor.extract(&solution).unwrap();
        let second = extractor.extract(&solution).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_start_outside_calendar_rejected() {
        let (model, mut solution) = solved(2, 2);
        let start = model.platform_vars[1].start;
        if let Some(assignment) = &mut solution.assignment {
            assignment.ints[start.0] = i64::MAX;
        }
        assert!(matches!(
            SolutionExtractor::new(&model).extract(&solution),
            Err(ScheduleError::ModelInvalid(_))
        ));

        if let Some(assignment) = &mut solution.assignment {
            assignment.ints[start.0] = 3_000_000_000;
        }
        assert!(matches!(
            SolutionExtractor::new(&model).extract(&solution),
            Err(ScheduleError::ModelInvalid(_))
        ));
    }

    #[test]
    fn test_extract_without_solution() {
        let (model, _) = solved(1, 1);
        let empty = CpSolution::empty(SolverStatus::Infeasible);
        assert_eq!(
            SolutionExtractor::new(&model).extract(&empty),
            Err(ScheduleError::NoSolutionAvailable)
        );
    }

    #[test]
    fn test_output_key_shape() {
        let (model, solution) = solved(2, 2);
        let schedule = SolutionExtractor::new(&model).extract(&solution).unwrap();
        let json = serde_json::to_value(&schedule).unwrap();

        for key in [
            "status",
            "objective_value",
            "solve_time_seconds",
            "platform_assignments",
            "summary",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["status"], "OPTIMAL");
        let assignment = &json["platform_assignments"][0];
        for key in [
            "platform_id",
            "assigned_machine",
            "start_time",
            "end_time",
            "num_cases",
            "cases",
            "priority_breakdown",
        ] {
            assert!(assignment.get(key).is_some(), "missing {key}");
        }
        assert_eq!(assignment["priority_breakdown"]["emergency"], 1);
        for key in ["total_platforms", "total_cases", "machines_used", "utilization_rate"] {
            assert!(json["summary"].get(key).is_some(), "missing {key}");
        }
    }
}
