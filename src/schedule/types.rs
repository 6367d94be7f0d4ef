//! Schedule output types.

use crate::case::{Platform, Priority};
use crate::cp::SolverStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal status of a scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Optimal,
    Feasible,
    Infeasible,
    TimeoutNoSolution,
}

impl ScheduleStatus {
    /// Maps a solver status; `None` for a rejected model.
    pub fn from_solver(status: SolverStatus) -> Option<Self> {
        match status {
            SolverStatus::Optimal => Some(Self::Optimal),
            SolverStatus::Feasible => Some(Self::Feasible),
            SolverStatus::Infeasible => Some(Self::Infeasible),
            SolverStatus::TimeoutNoSolution => Some(Self::TimeoutNoSolution),
            SolverStatus::ModelInvalid => None,
        }
    }

    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

/// Placement of one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAssignment {
    pub platform_id: usize,
    pub assigned_machine: usize,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_hours: i64,
    pub num_cases: usize,
    pub cases: Vec<String>,
    pub priority_breakdown: BTreeMap<Priority, usize>,
}

/// A platform run on a machine, in hours from the reference time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSlot {
    pub platform_id: usize,
    pub start: i64,
    pub end: i64,
}

/// Aggregate statistics of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_platforms: usize,
    pub total_cases: usize,
    pub machines_used: usize,
    /// `machines_used / machine_count`.
    pub utilization_rate: f64,
    pub avg_cases_per_platform: f64,
    /// Latest platform end, in hours from the reference time.
    pub planning_horizon_hours: i64,
}

impl ScheduleSummary {
    /// Summary of platforms that were not placed.
    pub(crate) fn unplaced(platforms: &[Platform]) -> Self {
        let total_cases: usize = platforms.iter().map(Platform::case_count).sum();
        Self {
            total_platforms: platforms.len(),
            total_cases,
            machines_used: 0,
            utilization_rate: 0.0,
            avg_cases_per_platform: average(total_cases, platforms.len()),
            planning_horizon_hours: 0,
        }
    }
}

pub(crate) fn average(total: usize, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// Result of a scheduling run.
///
/// Only `OPTIMAL` and `FEASIBLE` schedules carry assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub status: ScheduleStatus,
    pub objective_value: Option<i64>,
    pub solve_time_seconds: f64,
    pub platform_assignments: Vec<PlatformAssignment>,
    /// Runs per machine, ordered by start; idle machines are omitted.
    pub machine_utilization: BTreeMap<usize, Vec<MachineSlot>>,
    pub summary: ScheduleSummary,
    /// Platforms whose due hours fell back to the past-due buffer.
    pub past_due_platforms: Vec<usize>,
}

impl Schedule {
    /// A schedule without assignments, for runs that found no solution.
    pub fn unsolved(
        status: ScheduleStatus,
        solve_time_seconds: f64,
        platforms: &[Platform],
        past_due_platforms: Vec<usize>,
    ) -> Self {
        Self {
            status,
            objective_value: None,
            solve_time_seconds,
            platform_assignments: Vec::new(),
            machine_utilization: BTreeMap::new(),
            summary: ScheduleSummary::unplaced(platforms),
            past_due_platforms,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.status.has_solution()
    }

    pub fn assignment(&self, platform_id: usize) -> Option<&PlatformAssignment> {
        self.platform_assignments
            .iter()
            .find(|a| a.platform_id == platform_id)
    }
}
