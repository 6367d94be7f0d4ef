//! End-to-end scheduling scenarios.

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;
use u_platform_schedule::case::{Case, Priority};
use u_platform_schedule::{PlatformScheduler, Schedule, ScheduleStatus, SchedulerConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 11, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn in_days(days: u64) -> NaiveDate {
    now().date() + chrono::Days::new(days)
}

fn config(machines: usize, horizon: i64) -> SchedulerConfig {
    SchedulerConfig::default()
        .with_machine_count(machines)
        .with_planning_horizon_hours(horizon)
        .with_platform_duration_hours(16)
        .with_turnaround_hours(2)
        .with_time_limit_ms(20_000)
}

fn standard_cases(n: usize, due: NaiveDate) -> Vec<Case> {
    (0..n)
        .map(|i| Case::new(format!("CASE{i:03}"), Priority::Standard, due))
        .collect()
}

/// Every platform has one machine, runs within the horizon, and no two
/// platforms on a machine overlap including turnaround.
fn assert_valid(schedule: &Schedule, platforms: usize, horizon: i64, occupancy: i64) {
    assert_eq!(schedule.platform_assignments.len(), platforms);
    let ids: BTreeSet<usize> = schedule
        .platform_assignments
        .iter()
        .map(|a| a.platform_id)
        .collect();
    assert_eq!(ids.len(), platforms);

    for a in &schedule.platform_assignments {
        let start = (a.start_time - now()).num_hours();
        assert!((0..=horizon).contains(&start));
        assert!((a.end_time - now()).num_hours() <= horizon);
    }

    for slots in schedule.machine_utilization.values() {
        for pair in slots.windows(2) {
            assert!(
                pair[0].start + occupancy <= pair[1].start,
                "{:?} overlaps {:?}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn test_two_platforms_two_machines() {
    init_tracing();
    let cases = standard_cases(15, in_days(30));
    let schedule = PlatformScheduler::new(config(2, 200).with_cases_per_platform(14))
        .schedule(&cases, now())
        .unwrap();

    assert_eq!(schedule.status, ScheduleStatus::Optimal);
    assert_valid(&schedule, 2, 200, 18);
    assert_eq!(schedule.summary.total_cases, 15);
    assert_eq!(schedule.platform_assignments[0].num_cases, 14);
    assert_eq!(schedule.platform_assignments[1].num_cases, 1);
    // No lateness: the objective is the makespan alone.
    assert_eq!(schedule.objective_value, Some(16));
    assert_eq!(schedule.summary.planning_horizon_hours, 16);
    assert_eq!(schedule.summary.machines_used, 2);
}

#[test]
fn test_one_machine_back_to_back() {
    init_tracing();
    let cases = standard_cases(2, in_days(30));
    let config = config(1, 40).with_cases_per_platform(1);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    assert_eq!(schedule.status, ScheduleStatus::Optimal);
    assert_valid(&schedule, 2, 40, 18);
    let mut starts: Vec<i64> = schedule.machine_utilization[&0]
        .iter()
        .map(|s| s.start)
        .collect();
    starts.sort();
    assert_eq!(starts[0], 0);
    assert!(starts[1] >= 18);
}

#[test]
fn test_past_due_platform_still_scheduled() {
    init_tracing();
    let overdue = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
    let cases = vec![Case::new("LATE001", Priority::Standard, overdue)];
    let schedule = PlatformScheduler::new(config(2, 200))
        .schedule(&cases, now())
        .unwrap();

    assert!(schedule.is_solved());
    assert_eq!(schedule.past_due_platforms, vec![0]);
    assert_valid(&schedule, 1, 200, 18);
    // Finishes at 16h, inside the 24h buffer.
    assert_eq!(schedule.objective_value, Some(16));
}

#[test]
fn test_too_many_platforms_infeasible() {
    init_tracing();
    let cases = standard_cases(3, in_days(30));
    let config = config(1, 40).with_cases_per_platform(1);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    assert_eq!(schedule.status, ScheduleStatus::Infeasible);
    assert!(schedule.platform_assignments.is_empty());
    assert_eq!(schedule.objective_value, None);
    assert_eq!(schedule.summary.total_platforms, 3);
}

#[test]
fn test_zero_budget_reports_timeout() {
    init_tracing();
    let cases = standard_cases(30, in_days(30));
    let config = config(2, 400).with_time_limit_ms(0);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    assert_eq!(schedule.status, ScheduleStatus::TimeoutNoSolution);
    assert!(schedule.platform_assignments.is_empty());
}

#[test]
fn test_short_budget_returns_feasible_schedule() {
    init_tracing();
    let cases: Vec<Case> = (0..30)
        .map(|i| {
            let priority = Priority::ALL[i % 3];
            Case::new(format!("C{i:02}"), priority, in_days(1 + i as u64 % 6))
        })
        .collect();
    let budget_ms = 300;
    let config = config(3, 400)
        .with_cases_per_platform(1)
        .with_time_limit_ms(budget_ms);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    assert_eq!(schedule.status, ScheduleStatus::Feasible);
    assert_valid(&schedule, 30, 400, 18);
    assert!(schedule.objective_value.is_some());
    let slack = 0.5;
    assert!(
        schedule.solve_time_seconds < budget_ms as f64 / 1000.0 + slack,
        "took {}s",
        schedule.solve_time_seconds
    );
}

#[test]
fn test_platform_too_long_for_horizon() {
    let cases = standard_cases(1, in_days(30));
    let result = PlatformScheduler::new(config(1, 10)).schedule(&cases, now());
    assert!(matches!(
        result,
        Err(u_platform_schedule::ScheduleError::ModelConstruction(_))
    ));
}

#[test]
fn test_due_soon_platform_goes_first() {
    init_tracing();
    // The emergency platform is grouped first, but the standard case is
    // due within a day and the emergency one only in ten.
    let cases = vec![
        Case::new("STD", Priority::Standard, in_days(1)),
        Case::new("EMG", Priority::Emergency, in_days(10)),
    ];
    let config = config(1, 200).with_cases_per_platform(1);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    assert_eq!(schedule.status, ScheduleStatus::Optimal);
    assert_eq!(schedule.platform_assignments[0].cases, vec!["EMG"]);
    let standard = schedule.assignment(1).unwrap();
    assert_eq!(standard.start_time, now());
    assert_eq!(schedule.objective_value, Some(34));

    let report = schedule.delivery_report(&cases);
    assert_eq!(report.on_time, 2);
}

#[test]
fn test_emergency_lateness_dominates() {
    init_tracing();
    // Both due tomorrow on one machine: one of them must be late, and it
    // should not be the emergency.
    let cases = vec![
        Case::new("STD", Priority::Standard, in_days(1)),
        Case::new("EMG", Priority::Emergency, in_days(1)),
    ];
    let config = config(1, 200).with_cases_per_platform(1);
    let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

    let emergency = schedule
        .platform_assignments
        .iter()
        .find(|a| a.cases == vec!["EMG"])
        .unwrap();
    assert_eq!(emergency.start_time, now());
    // Makespan 34 plus 10h of standard lateness at weight 10.
    assert_eq!(schedule.objective_value, Some(134));
}

#[test]
fn test_parallel_workers_match_sequential() {
    init_tracing();
    let cases: Vec<Case> = (0..8)
        .map(|i| {
            let priority = Priority::ALL[i % 3];
            Case::new(format!("C{i}"), priority, in_days(1 + (i as u64 % 4)))
        })
        .collect();
    let base = config(3, 400).with_cases_per_platform(1);
    let sequential = PlatformScheduler::new(base.clone())
        .schedule(&cases, now())
        .unwrap();
    let mut parallel_config = base;
    parallel_config.solver.num_workers = 4;
    let parallel = PlatformScheduler::new(parallel_config)
        .schedule(&cases, now())
        .unwrap();

    assert_eq!(sequential.status, ScheduleStatus::Optimal);
    assert_eq!(parallel.status, ScheduleStatus::Optimal);
    assert_eq!(sequential.objective_value, parallel.objective_value);
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Emergency),
        Just(Priority::Urgent),
        Just(Priority::Standard),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_solved_schedules_are_valid(
        jobs in prop::collection::vec((priority(), 0u64..10), 1..9),
        capacity in 1usize..4,
        machines in 1usize..4,
    ) {
        let cases: Vec<Case> = jobs
            .iter()
            .enumerate()
            .map(|(i, &(p, days))| Case::new(format!("C{i}"), p, in_days(days)))
            .collect();
        let platforms = cases.len().div_ceil(capacity);
        let config = config(machines, 400)
            .with_cases_per_platform(capacity)
            .with_time_limit_ms(2_000);
        let schedule = PlatformScheduler::new(config).schedule(&cases, now()).unwrap();

        prop_assert!(schedule.is_solved());
        assert_valid(&schedule, platforms, 400, 18);
        prop_assert_eq!(schedule.summary.total_cases, cases.len());
    }
}
