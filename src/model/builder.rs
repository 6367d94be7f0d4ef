//! Translation of platforms into a constraint model.

use crate::case::Platform;
use crate::config::SchedulerConfig;
use crate::cp::{BoolVar, BoolVarId, Constraint, CpModel, IntVar, IntVarId, IntervalRef, Objective};
use crate::error::{Result, ScheduleError};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::{info, warn};

/// Variables of one platform.
#[derive(Debug, Clone)]
pub struct PlatformVars {
    /// Task index inside the constraint model.
    pub task: usize,
    pub start: IntVarId,
    /// `literals[m]` is true iff the platform runs on machine `m`.
    pub literals: Vec<BoolVarId>,
    pub lateness: IntVarId,
    /// Due hours after the past-due fallback.
    pub due_hours: i64,
    /// Whether the past-due fallback replaced the computed due hours.
    pub past_due: bool,
    /// Lateness weight per hour.
    pub weight: i64,
}

/// Tardiness variable of one tracked case.
#[derive(Debug, Clone)]
pub struct CaseTardiness {
    pub case_id: String,
    /// Index of the owning platform in [`PlatformModel::platforms`].
    pub platform: usize,
    pub tardiness: IntVarId,
    /// Hours from the reference time to the case due date; may be negative.
    pub due_hours: i64,
    pub weight: i64,
}

/// An immutable scheduling model: the constraint model plus the mapping
/// from its variables back to platforms and cases.
#[derive(Debug, Clone)]
pub struct PlatformModel {
    pub cp: CpModel,
    pub platforms: Vec<Platform>,
    pub platform_vars: Vec<PlatformVars>,
    pub tardiness: Vec<CaseTardiness>,
    pub makespan: IntVarId,
    pub reference_time: NaiveDateTime,
    pub machine_count: usize,
    pub duration_hours: i64,
    pub turnaround_hours: i64,
    pub horizon_hours: i64,
}

impl PlatformModel {
    /// Ids of the platforms whose due hours fell back to the buffer.
    pub fn past_due_platforms(&self) -> Vec<usize> {
        self.platforms
            .iter()
            .zip(&self.platform_vars)
            .filter(|(_, vars)| vars.past_due)
            .map(|(p, _)| p.id)
            .collect()
    }
}

/// Builds a [`PlatformModel`] from grouped platforms.
///
/// # Model
///
/// For every platform `p` and machine `m`:
///
/// - `p_machine_m`: assignment literal, exactly one true per platform
/// - `start_p` in `[0, H]`
/// - for each pair `(p, q)` and machine `m`: `both_assigned_p_q_m <=>
///   p_machine_m AND q_machine_m`, gating a no-overlap disjunction over
///   `[start, start + D + T)`
/// - `lateness_p >= start_p + D - due_p`, `lateness_p >= 0`
/// - `tardiness_j >= start_p(j) + D - due_j` for tracked cases
/// - `makespan >= start_p + D`, `makespan <= H`
///
/// Objective: `makespan + sum weight_p * lateness_p + sum w_j * tardiness_j`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_platform_schedule::case::{Case, CaseGrouper, Priority};
/// use u_platform_schedule::model::ScheduleModelBuilder;
/// use u_platform_schedule::SchedulerConfig;
///
/// let now = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let due = NaiveDate::from_ymd_opt(2026, 11, 20).unwrap();
/// let cases = vec![Case::new("A", Priority::Urgent, due)];
/// let platforms = CaseGrouper::new(14).group(&cases).unwrap();
///
/// let config = SchedulerConfig::default().with_machine_count(2);
/// let model = ScheduleModelBuilder::new(&platforms, &config, now).build().unwrap();
/// assert_eq!(model.platform_vars.len(), 1);
/// assert_eq!(model.tardiness.len(), 1);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScheduleModelBuilder<'a> {
    platforms: &'a [Platform],
    config: &'a SchedulerConfig,
    reference_time: NaiveDateTime,
}

impl<'a> ScheduleModelBuilder<'a> {
    pub fn new(
        platforms: &'a [Platform],
        config: &'a SchedulerConfig,
        reference_time: NaiveDateTime,
    ) -> Self {
        Self {
            platforms,
            config,
            reference_time,
        }
    }

    /// Whole hours from the reference time to the start of `date`.
    pub fn hours_until(&self, date: NaiveDate) -> i64 {
        (date.and_time(NaiveTime::MIN) - self.reference_time).num_hours()
    }

    pub fn build(&self) -> Result<PlatformModel> {
        let config = self.config;
        if self.platforms.is_empty() {
            return Err(ScheduleError::InvalidInput("no platforms to schedule".into()));
        }
        config.validate()?;
        if self.platforms.iter().any(|p| p.cases.is_empty()) {
            return Err(ScheduleError::InvalidInput("platform without cases".into()));
        }

        let duration = config.platform_duration_hours;
        let occupancy = config.occupancy_hours();
        let horizon = config.planning_horizon_hours;
        let machines = config.machine_count;
        if occupancy > horizon {
            return Err(ScheduleError::ModelConstruction(format!(
                "platform needs {occupancy}h ({duration}h print + {}h turnaround) \
                 but the horizon is {horizon}h",
                config.turnaround_hours
            )));
        }
        let horizon_end = TimeDelta::try_hours(horizon)
            .and_then(|span| self.reference_time.checked_add_signed(span));
        if horizon_end.is_none() {
            return Err(ScheduleError::ModelConstruction(format!(
                "{horizon}h after {} is not a representable time",
                self.reference_time
            )));
        }

        let mut cp = CpModel::new("platform_schedule", horizon, machines);

        let tasks: Vec<usize> = self
            .platforms
            .iter()
            .map(|p| cp.add_task(&format!("platform_{}", p.id), duration, occupancy))
            .collect();

        for (i, (pi, &ti)) in self.platforms.iter().zip(&tasks).enumerate() {
            for (pj, &tj) in self.platforms.iter().zip(&tasks).skip(i + 1) {
                for m in 0..machines {
                    let both = cp.add_bool_var(BoolVar::new(format!(
                        "both_assigned_{}_{}_{m}",
                        pi.id, pj.id
                    )));
                    let (a, b) = (cp.tasks[ti].literals[m], cp.tasks[tj].literals[m]);
                    cp.add_constraint(Constraint::BothTrue {
                        indicator: both,
                        a,
                        b,
                    });
                    let (si, sj) = (cp.tasks[ti].start, cp.tasks[tj].start);
                    cp.add_constraint(Constraint::GatedNoOverlap {
                        gate: both,
                        first: IntervalRef::new(si, occupancy),
                        second: IntervalRef::new(sj, occupancy),
                    });
                }
            }
        }

        let mut terms = Vec::new();
        let makespan = cp.add_int_var(IntVar::new("makespan", 0, horizon));
        terms.push((makespan, 1));

        let mut platform_vars = Vec::with_capacity(self.platforms.len());
        let mut tardiness = Vec::new();
        for (index, (platform, &task)) in self.platforms.iter().zip(&tasks).enumerate() {
            let start = cp.tasks[task].start;
            cp.add_constraint(Constraint::AtLeast {
                target: makespan,
                source: start,
                offset: duration,
            });

            let (due_hours, past_due) = self.platform_due_hours(platform);
            let lateness = cp.add_int_var(IntVar::new(format!("lateness_{}", platform.id), 0, horizon));
            cp.add_constraint(Constraint::AtLeast {
                target: lateness,
                source: start,
                offset: duration - due_hours,
            });
            let weight = config.weights.platform_weight(platform).ok_or_else(|| {
                ScheduleError::ModelConstruction(format!(
                    "lateness weight of platform {} overflows",
                    platform.id
                ))
            })?;
            terms.push((lateness, weight));

            for case in &platform.cases {
                let case_due = self.hours_until(case.due_date);
                if case_due < 0 {
                    warn!(
                        case_id = %case.case_id,
                        priority = %case.priority,
                        due_hours = case_due,
                        "case is already past due"
                    );
                }
                if !config.weights.tracks(case.priority) {
                    continue;
                }
                let var = cp.add_int_var(IntVar::new(
                    format!("tardiness_{}", case.case_id),
                    0,
                    horizon + (-case_due).max(0),
                ));
                cp.add_constraint(Constraint::AtLeast {
                    target: var,
                    source: start,
                    offset: duration - case_due,
                });
                let case_weight = config.weights.case_weight(case.priority);
                terms.push((var, case_weight));
                tardiness.push(CaseTardiness {
                    case_id: case.case_id.clone(),
                    platform: index,
                    tardiness: var,
                    due_hours: case_due,
                    weight: case_weight,
                });
            }

            platform_vars.push(PlatformVars {
                task,
                start,
                literals: cp.tasks[task].literals.clone(),
                lateness,
                due_hours,
                past_due,
                weight,
            });
        }

        if worst_objective(&cp, &terms).is_none() {
            return Err(ScheduleError::ModelConstruction(
                "objective can exceed the integer range; lower the weights or the horizon".into(),
            ));
        }
        cp.set_objective(Objective::Minimize { terms });
        cp.validate().map_err(ScheduleError::ModelConstruction)?;

        let past_due = platform_vars.iter().filter(|v| v.past_due).count();
        info!(
            platforms = self.platforms.len(),
            machines,
            int_vars = cp.int_var_count(),
            bool_vars = cp.bool_var_count(),
            constraints = cp.constraint_count(),
            tracked_cases = tardiness.len(),
            past_due,
            "built scheduling model"
        );

        Ok(PlatformModel {
            cp,
            platforms: self.platforms.to_vec(),
            platform_vars,
            tardiness,
            makespan,
            reference_time: self.reference_time,
            machine_count: machines,
            duration_hours: duration,
            turnaround_hours: config.turnaround_hours,
            horizon_hours: horizon,
        })
    }

    /// Due hours of the platform's earliest case, with the past-due fallback.
    fn platform_due_hours(&self, platform: &Platform) -> (i64, bool) {
        let Some(earliest) = platform.earliest_due() else {
            return (self.config.planning_horizon_hours, false);
        };
        let hours = self.hours_until(earliest);
        if hours < 0 {
            let buffer = self.config.past_due_buffer_hours;
            warn!(
                platform_id = platform.id,
                due_hours = hours,
                buffer_hours = buffer,
                "platform past due, using buffer"
            );
            (buffer, true)
        } else {
            (hours, false)
        }
    }
}

/// Largest objective value any assignment within the domains can reach.
fn worst_objective(cp: &CpModel, terms: &[(IntVarId, i64)]) -> Option<i64> {
    terms.iter().try_fold(0i64, |total, &(var, coeff)| {
        let var = &cp.int_vars[var.0];
        let extreme = var.min.checked_abs()?.max(var.max.checked_abs()?);
        total.checked_add(coeff.checked_mul(extreme)?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{Case, Priority};
    use crate::model::{PenaltyWeights, PriorityTable};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 11, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, d).unwrap()
    }

    fn platforms(specs: &[&[(Priority, u32)]]) -> Vec<Platform> {
        specs
            .iter()
            .enumerate()
            .map(|(id, cases)| {
                let cases = cases
                    .iter()
                    .enumerate()
                    .map(|(i, &(p, d))| Case::new(format!("P{id}C{i}"), p, day(d)))
                    .collect();
                Platform::new(id, cases)
            })
            .collect()
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig::default()
            .with_machine_count(2)
            .with_planning_horizon_hours(200)
    }

    #[test]
    fn test_model_dimensions() {
        let platforms = platforms(&[
            &[(Priority::Standard, 20)],
            &[(Priority::Urgent, 20), (Priority::Emergency, 25)],
            &[(Priority::Standard, 30)],
        ]);
        let config = config();
        let model = ScheduleModelBuilder::new(&platforms, &config, now())
            .build()
            .unwrap();

        // 3 starts + makespan + 3 lateness + 2 tracked tardiness
        assert_eq!(model.cp.int_var_count(), 9);
        // 3 * 2 literals + 3 pairs * 2 machines indicators
        assert_eq!(model.cp.bool_var_count(), 12);
        assert_eq!(model.tardiness.len(), 2);
        assert_eq!(model.platform_vars[1].weight, 100 + 1000 + 10);
        assert!(model.past_due_platforms().is_empty());
        assert!(model.cp.bool_vars.iter().any(|v| v.name == "both_assigned_0_2_1"));
    }

    #[test]
    fn test_due_hours_truncated_from_reference() {
        let platforms = platforms(&[&[(Priority::Standard, 3)]]);
        let config = config();
        let builder = ScheduleModelBuilder::new(&platforms, &config, now());
        // 2026-11-01 06:00 -> 2026-11-03 00:00
        assert_eq!(builder.hours_until(day(3)), 42);
        let model = builder.build().unwrap();
        assert_eq!(model.platform_vars[0].due_hours, 42);
    }

    #[test]
    fn test_past_due_platform_uses_buffer() {
        let late = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let platforms = vec![Platform::new(
            7,
            vec![Case::new("OLD", Priority::Emergency, late)],
        )];
        let config = config();
        let model = ScheduleModelBuilder::new(&platforms, &config, now())
            .build()
            .unwrap();

        assert_eq!(model.platform_vars[0].due_hours, 24);
        assert_eq!(model.past_due_platforms(), vec![7]);
        // The case itself keeps its negative due hours and a widened domain.
        let tardy = &model.tardiness[0];
        assert!(tardy.due_hours < 0);
        let var = &model.cp.int_vars[tardy.tardiness.0];
        assert_eq!(var.max, 200 - tardy.due_hours);
    }

    #[test]
    fn test_platform_longer_than_horizon() {
        let platforms = platforms(&[&[(Priority::Standard, 20)]]);
        let config = config().with_planning_horizon_hours(17);
        let result = ScheduleModelBuilder::new(&platforms, &config, now()).build();
        assert!(matches!(result, Err(ScheduleError::ModelConstruction(_))));
    }

    #[test]
    fn test_invalid_inputs() {
        let config = config();
        let empty = ScheduleModelBuilder::new(&[], &config, now()).build();
        assert!(matches!(empty, Err(ScheduleError::InvalidInput(_))));

        let platforms = platforms(&[&[(Priority::Standard, 20)]]);
        let no_machines = config.clone().with_machine_count(0);
        let result = ScheduleModelBuilder::new(&platforms, &no_machines, now()).build();
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));

        let no_duration = config.with_platform_duration_hours(0);
        let result = ScheduleModelBuilder::new(&platforms, &no_duration, now()).build();
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
    }

    #[test]
    fn test_overflowing_platform_weight_rejected() {
        let platforms = platforms(&[&[(Priority::Emergency, 20); 5]]);
        let weights = PenaltyWeights::default()
            .with_platform_per_case(PriorityTable::new(i64::MAX / 4, 100, 0));
        let config = config().with_weights(weights);
        assert!(config.validate().is_ok());

        let result = ScheduleModelBuilder::new(&platforms, &config, now()).build();
        assert!(matches!(result, Err(ScheduleError::ModelConstruction(_))));
    }

    #[test]
    fn test_overflowing_objective_rejected() {
        // The weight fits, but weight * horizon does not.
        let platforms = platforms(&[&[(Priority::Standard, 20)]]);
        let weights = PenaltyWeights::default().with_platform_base(i64::MAX / 100);
        let config = config().with_weights(weights);

        let result = ScheduleModelBuilder::new(&platforms, &config, now()).build();
        assert!(matches!(result, Err(ScheduleError::ModelConstruction(_))));
    }

    #[test]
    fn test_oversized_occupancy_rejected() {
        let platforms = platforms(&[&[(Priority::Standard, 20)]]);
        let config = config()
            .with_platform_duration_hours(i64::MAX)
            .with_turnaround_hours(2);

        let result = ScheduleModelBuilder::new(&platforms, &config, now()).build();
        assert!(matches!(result, Err(ScheduleError::ModelConstruction(_))));
    }

    #[test]
    fn test_horizon_past_calendar_end_rejected() {
        let platforms = platforms(&[&[(Priority::Standard, 20)]]);
        let config = config();
        let end_of_time = NaiveDate::MAX.and_hms_opt(0, 0, 0).unwrap();

        let result = ScheduleModelBuilder::new(&platforms, &config, end_of_time).build();
        assert!(matches!(result, Err(ScheduleError::ModelConstruction(_))));
    }

    #[test]
    fn test_zero_weight_priorities_untracked() {
        let platforms = platforms(&[&[(Priority::Standard, 20), (Priority::Standard, 21)]]);
        let config = config();
        let model = ScheduleModelBuilder::new(&platforms, &config, now())
            .build()
            .unwrap();
        assert!(model.tardiness.is_empty());
        assert_eq!(model.platform_vars[0].weight, 10);
    }
}
