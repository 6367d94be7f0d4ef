//! Per-case delivery report.

use super::types::Schedule;
use crate::case::{Case, Priority};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const SECONDS_PER_DAY: i64 = 86_400;

/// Delivery outlook of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDelivery {
    pub case_id: String,
    pub priority: Priority,
    pub platform_id: usize,
    pub assigned_machine: usize,
    pub completion_time: NaiveDateTime,
    pub due_date: NaiveDate,
    pub surgery_date: NaiveDate,
    /// The platform finishes on or before the due date.
    pub on_time: bool,
    /// Whole days between completion and the start of the surgery date,
    /// rounded down.
    pub days_before_surgery: i64,
}

/// Delivery outlook of every scheduled case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub deliveries: Vec<CaseDelivery>,
    pub on_time: usize,
    pub on_time_rate: f64,
}

impl Schedule {
    /// Joins the schedule with the case records it was built from.
    ///
    /// Case ids missing from `cases` are skipped. Unsolved schedules give
    /// an empty report.
    pub fn delivery_report(&self, cases: &[Case]) -> DeliveryReport {
        let by_id: HashMap<&str, &Case> = cases.iter().map(|c| (c.case_id.as_str(), c)).collect();

        let deliveries: Vec<CaseDelivery> = self
            .platform_assignments
            .iter()
            .flat_map(|a| a.cases.iter().map(move |id| (a, id)))
            .filter_map(|(assignment, id)| {
                let case = by_id.get(id.as_str())?;
                let end = assignment.end_time;
                let until_surgery = case.surgery_date.and_time(NaiveTime::MIN) - end;
                Some(CaseDelivery {
                    case_id: case.case_id.clone(),
                    priority: case.priority,
                    platform_id: assignment.platform_id,
                    assigned_machine: assignment.assigned_machine,
                    completion_time: end,
                    due_date: case.due_date,
                    surgery_date: case.surgery_date,
                    on_time: case.due_date >= end.date(),
                    days_before_surgery: until_surgery.num_seconds().div_euclid(SECONDS_PER_DAY),
                })
            })
            .collect();

        let on_time = deliveries.iter().filter(|d| d.on_time).count();
        DeliveryReport {
            on_time_rate: super::types::average(on_time, deliveries.len()),
            on_time,
            deliveries,
        }
    }
}
