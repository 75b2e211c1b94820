//! Lesson progress tracking and the lesson → topic → subject rollups.

mod aggregator;
mod dashboard;
mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{ProgressAggregator, RollupOutcome};
pub use dashboard::DashboardService;
pub use tracker::{CompletionReport, ProgressTracker, RollupStatus};
