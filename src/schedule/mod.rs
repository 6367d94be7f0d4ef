//! Schedule extraction and output types.
//!
//! [`SolutionExtractor`] maps a solved model back to platforms: machine,
//! start and end timestamps per platform, per-machine runs, and summary
//! statistics. The output shape is stable; downstream reporting reads it
//! by key.

mod extractor;
mod report;
mod types;

pub use extractor::SolutionExtractor;
pub use report::{CaseDelivery, DeliveryReport};
pub use types::{MachineSlot, PlatformAssignment, Schedule, ScheduleStatus, ScheduleSummary};
