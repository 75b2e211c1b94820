use std::sync::Arc;

use edu_core::model::{
    LessonId, LessonPlacement, Percent, SubjectProgress, TopicProgress, UserId,
};
use edu_core::time::Clock;
use storage::repository::{CatalogRepository, LessonProgressRepository, RollupRepository};
use tracing::{debug, warn};

use crate::error::AggregationError;

/// What a recalculation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupOutcome {
    /// Both rollups were rewritten.
    Updated {
        topic: TopicProgress,
        subject: SubjectProgress,
    },
    /// The lesson has no topic/subject in the catalog; nothing was written.
    LessonUnresolved,
}

/// Recomputes topic and subject percentages bottom-up after a lesson changes.
///
/// The topic value is always recomputed from the lesson facts. The subject
/// value is the average of the materialized topic rows, so the topic write
/// must land before the subject step reads it.
#[derive(Clone)]
pub struct ProgressAggregator {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    lessons: Arc<dyn LessonProgressRepository>,
    rollups: Arc<dyn RollupRepository>,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        lessons: Arc<dyn LessonProgressRepository>,
        rollups: Arc<dyn RollupRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            lessons,
            rollups,
        }
    }

    /// Recalculate the rollups above `lesson_id` for one user.
    ///
    /// An unknown lesson is logged and reported as
    /// `RollupOutcome::LessonUnresolved` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `AggregationError::Storage` if any read or write fails. Rows
    /// written before the failure are left in place.
    #[tracing::instrument(skip(self), fields(user = %user_id, lesson = %lesson_id))]
    pub async fn recalculate(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<RollupOutcome, AggregationError> {
        let Some(placement) = self.catalog.locate_lesson(lesson_id).await? else {
            warn!("lesson has no topic/subject in the catalog; skipping rollup");
            return Ok(RollupOutcome::LessonUnresolved);
        };

        let topic = self.recalculate_topic(user_id, &placement).await?;
        let subject = self.recalculate_subject(user_id, &placement).await?;

        Ok(RollupOutcome::Updated { topic, subject })
    }

    async fn recalculate_topic(
        &self,
        user_id: UserId,
        placement: &LessonPlacement,
    ) -> Result<TopicProgress, AggregationError> {
        let total = self.catalog.count_lessons(placement.topic_id).await?;
        let completed = self
            .lessons
            .count_completed_in_topic(user_id, placement.topic_id)
            .await?;

        let progress = TopicProgress {
            user_id,
            topic_id: placement.topic_id,
            percent: Percent::of(completed, total),
            updated_at: self.clock.now(),
        };
        self.rollups.upsert_topic_progress(&progress).await?;

        debug!(
            topic = %placement.topic_id,
            completed,
            total,
            percent = progress.percent.value(),
            "topic rollup written"
        );
        Ok(progress)
    }

    async fn recalculate_subject(
        &self,
        user_id: UserId,
        placement: &LessonPlacement,
    ) -> Result<SubjectProgress, AggregationError> {
        let topic_ids = self.catalog.list_topic_ids(placement.subject_id).await?;
        let percents = self.rollups.topic_percents(user_id, &topic_ids).await?;

        // Topics without a row count as 0 through the denominator.
        let percent = Percent::average(
            topic_ids.iter().filter_map(|id| percents.get(id).copied()),
            topic_ids.len(),
        );

        let progress = SubjectProgress {
            user_id,
            subject_id: placement.subject_id,
            percent,
            updated_at: self.clock.now(),
        };
        self.rollups.upsert_subject_progress(&progress).await?;

        debug!(
            subject = %placement.subject_id,
            topics = topic_ids.len(),
            percent = percent.value(),
            "subject rollup written"
        );
        Ok(progress)
    }
}
