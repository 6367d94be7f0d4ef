//! Scheduling model construction.
//!
//! Turns grouped platforms into a [`CpModel`](crate::cp::CpModel) over
//! machine assignment literals and start hours, with weighted lateness
//! and tardiness penalties.
//!
//! # Due hours
//!
//! A platform is due at the earliest due date of its cases, measured in
//! whole hours from the reference time to 00:00 of that date. Platforms
//! already past due are given `past_due_buffer_hours` instead and are
//! reported through [`PlatformModel::past_due_platforms`]. Cases keep
//! their own (possibly negative) due hours.

mod builder;
mod weights;

pub use builder::{CaseTardiness, PlatformModel, PlatformVars, ScheduleModelBuilder};
pub use weights::{PenaltyWeights, PriorityTable};
