#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod progress;

pub use edu_core::Clock;

pub use app_services::ProgressServices;
pub use catalog_service::{CatalogImport, CatalogService, ImportSummary};
pub use error::{AggregationError, AppServicesError, CatalogServiceError, ProgressServiceError};
pub use progress::{
    CompletionReport, DashboardService, ProgressAggregator, ProgressTracker, RollupOutcome,
    RollupStatus,
};
