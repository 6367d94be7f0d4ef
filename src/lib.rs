//! Platform scheduling for batch 3D printing.
//!
//! Print cases are grouped into fixed-size platforms, and each platform is
//! assigned to one of a pool of identical printers with a start hour, such
//! that no printer runs two platforms at once and urgent work finishes
//! before its due date.
//!
//! - **Case grouping** ([`case`]): stable sort by priority then due date,
//!   chunked into platforms.
//! - **Model building** ([`model`]): assignment literals, start hours,
//!   gated no-overlap constraints, weighted lateness and tardiness.
//! - **Solving** ([`cp`]): exact branch-and-bound over dispatch sequences,
//!   with a deadline, warm start and optional parallel workers.
//! - **Extraction** ([`schedule`]): per-platform timestamps, machine
//!   utilization and summary statistics.
//!
//! [`PlatformScheduler`] runs the whole pipeline.
//!
//! # Architecture
//!
//! Data flows one way: grouper, builder, solver, extractor. The constraint
//! layer in [`cp`] is independent of printing; only [`model`] knows how
//! platforms map onto it.

pub mod case;
pub mod config;
pub mod cp;
pub mod error;
pub mod model;
pub mod schedule;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use error::{Result, ScheduleError};
pub use schedule::{Schedule, ScheduleStatus};
pub use scheduler::PlatformScheduler;
