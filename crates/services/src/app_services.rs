use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::progress::{DashboardService, ProgressAggregator, ProgressTracker};

/// Explicitly assembled service graph; one per process, passed to the HTTP layer.
#[derive(Clone)]
pub struct ProgressServices {
    tracker: Arc<ProgressTracker>,
    dashboard: Arc<DashboardService>,
    catalog: Arc<CatalogService>,
}

impl ProgressServices {
    /// Wire services over an existing storage handle.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let aggregator = ProgressAggregator::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.lesson_progress),
            Arc::clone(&storage.rollups),
        );
        let tracker = Arc::new(ProgressTracker::new(
            clock,
            Arc::clone(&storage.lesson_progress),
            aggregator,
        ));
        let dashboard = Arc::new(DashboardService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.rollups),
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));

        Self {
            tracker,
            dashboard,
            catalog,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }
}
