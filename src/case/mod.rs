//! Case records and platform grouping.
//!
//! Cases arrive from the ingestion layer as flat records. The grouper
//! sorts them by urgency and packs them into fixed-capacity platforms,
//! the unit the optimization model schedules.

mod grouper;
mod platform;
mod types;

pub use grouper::CaseGrouper;
pub use platform::Platform;
pub use types::{Case, Priority};
