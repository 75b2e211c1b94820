use std::collections::BTreeMap;
use std::sync::Arc;

use edu_core::model::{Percent, SubjectId, TopicId, UserId};
use storage::repository::{CatalogRepository, RollupRepository};

use crate::error::ProgressServiceError;

/// Read side: serves the materialized percentages, never recomputes them.
#[derive(Clone)]
pub struct DashboardService {
    catalog: Arc<dyn CatalogRepository>,
    rollups: Arc<dyn RollupRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, rollups: Arc<dyn RollupRepository>) -> Self {
        Self { catalog, rollups }
    }

    /// Subject → percent complete for one user.
    ///
    /// A user with no progress yet gets an empty map.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails.
    pub async fn dashboard_progress(
        &self,
        user_id: UserId,
    ) -> Result<BTreeMap<SubjectId, Percent>, ProgressServiceError> {
        let rows = self.rollups.list_subject_progress(user_id).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.subject_id, row.percent))
            .collect())
    }

    /// Topic → percent complete for every topic of a subject.
    ///
    /// Topics the user has not touched are reported as 0.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if a read fails.
    pub async fn topic_breakdown(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<BTreeMap<TopicId, Percent>, ProgressServiceError> {
        let topic_ids = self.catalog.list_topic_ids(subject_id).await?;
        let stored = self.rollups.topic_percents(user_id, &topic_ids).await?;
        Ok(topic_ids
            .into_iter()
            .map(|id| (id, stored.get(&id).copied().unwrap_or(Percent::ZERO)))
            .collect())
    }
}
