use std::sync::Arc;

use edu_core::model::{LessonCompletion, LessonId, LessonProgress, QuizScore, UserId};
use edu_core::time::Clock;
use storage::repository::LessonProgressRepository;
use tracing::{info, warn};

use super::aggregator::{ProgressAggregator, RollupOutcome};
use crate::error::{AggregationError, ProgressServiceError};

/// How the rollup step went after a completion was recorded.
#[derive(Debug)]
pub enum RollupStatus {
    Updated(RollupOutcome),
    /// The lesson could not be placed in the catalog.
    Skipped,
    /// The completion is stored but the rollups may be stale.
    Failed(AggregationError),
}

impl RollupStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RollupStatus::Updated(_) => "updated",
            RollupStatus::Skipped => "skipped",
            RollupStatus::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, RollupStatus::Failed(_))
    }
}

/// Result of `ProgressTracker::complete_lesson`.
#[derive(Debug)]
pub struct CompletionReport {
    /// The lesson row as stored after the upsert.
    pub progress: LessonProgress,
    pub rollup: RollupStatus,
}

/// Records per-user lesson engagement and triggers the rollups.
#[derive(Clone)]
pub struct ProgressTracker {
    clock: Clock,
    lessons: Arc<dyn LessonProgressRepository>,
    aggregator: ProgressAggregator,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        lessons: Arc<dyn LessonProgressRepository>,
        aggregator: ProgressAggregator,
    ) -> Self {
        Self {
            clock,
            lessons,
            aggregator,
        }
    }

    /// Mark a lesson as started unless the user already has a row for it.
    ///
    /// Returns `true` when a new row was created. Repeated calls, including
    /// calls after completion, leave the existing row untouched.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    #[tracing::instrument(skip(self), fields(user = %user_id, lesson = %lesson_id))]
    pub async fn start_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<bool, ProgressServiceError> {
        let progress = LessonProgress::started(user_id, lesson_id, self.clock.now());
        let created = self.lessons.insert_started(&progress).await?;
        if created {
            info!("lesson started");
        }
        Ok(created)
    }

    /// Record a completion, then recompute the topic and subject rollups.
    ///
    /// The completion is written first and stays written even if the rollup
    /// step fails; that failure is logged and returned in
    /// `CompletionReport::rollup`. Calling this again re-runs the rollups.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` only if the completion itself
    /// cannot be stored.
    #[tracing::instrument(skip(self), fields(user = %user_id, lesson = %lesson_id))]
    pub async fn complete_lesson(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        quiz_score: Option<QuizScore>,
    ) -> Result<CompletionReport, ProgressServiceError> {
        let completion = LessonCompletion {
            user_id,
            lesson_id,
            quiz_score,
            completed_at: self.clock.now(),
        };
        let progress = self.lessons.upsert_completion(&completion).await?;
        info!("lesson completed");

        let rollup = match self.aggregator.recalculate(user_id, lesson_id).await {
            Ok(RollupOutcome::LessonUnresolved) => RollupStatus::Skipped,
            Ok(outcome) => RollupStatus::Updated(outcome),
            Err(err) => {
                warn!(error = %err, "rollup failed after lesson completion");
                RollupStatus::Failed(err)
            }
        };

        Ok(CompletionReport { progress, rollup })
    }

    /// Current row for (user, lesson), if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails.
    pub async fn lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, ProgressServiceError> {
        Ok(self.lessons.get_lesson_progress(user_id, lesson_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Duration;
    use edu_core::model::{LessonStatus, Percent, SubjectProgress, TopicId, TopicProgress};
    use edu_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, RollupRepository, StorageError};

    use crate::progress::test_support::{CurriculumBuilder, pct};

    fn tracker_with(
        clock: Clock,
        repo: &InMemoryRepository,
        rollups: Arc<dyn RollupRepository>,
    ) -> ProgressTracker {
        let aggregator = ProgressAggregator::new(
            clock,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            rollups,
        );
        ProgressTracker::new(clock, Arc::new(repo.clone()), aggregator)
    }

    fn tracker(clock: Clock, repo: &InMemoryRepository) -> ProgressTracker {
        tracker_with(clock, repo, Arc::new(repo.clone()))
    }

    /// Topic writes succeed; subject writes fail.
    struct SubjectWritesFail(InMemoryRepository);

    #[async_trait]
    impl RollupRepository for SubjectWritesFail {
        async fn upsert_topic_progress(&self, p: &TopicProgress) -> Result<(), StorageError> {
            self.0.upsert_topic_progress(p).await
        }

        async fn topic_percents(
            &self,
            user_id: UserId,
            topic_ids: &[TopicId],
        ) -> Result<HashMap<TopicId, Percent>, StorageError> {
            self.0.topic_percents(user_id, topic_ids).await
        }

        async fn upsert_subject_progress(&self, _progress: &SubjectProgress) -> Result<(), StorageError> {
            Err(StorageError::Connection("database is locked".into()))
        }

        async fn list_subject_progress(
            &self,
            user_id: UserId,
        ) -> Result<Vec<SubjectProgress>, StorageError> {
            self.0.list_subject_progress(user_id).await
        }
    }

    #[tokio::test]
    async fn starting_twice_keeps_original_started_at() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let lesson = LessonId::random();

        let clock = Clock::fixed(fixed_now());
        assert!(tracker(clock, &repo).start_lesson(user, lesson).await.unwrap());
        let later = tracker(clock.later(Duration::hours(3)), &repo);
        assert!(!later.start_lesson(user, lesson).await.unwrap());

        let row = repo.get_lesson_progress(user, lesson).await.unwrap().unwrap();
        assert_eq!(row.status(), LessonStatus::Started);
        assert_eq!(row.started_at(), fixed_now());
    }

    #[tokio::test]
    async fn start_after_complete_does_not_downgrade() {
        let repo = InMemoryRepository::new();
        let tree = CurriculumBuilder::new().topic(1).build(&repo).await;
        let user = UserId::random();
        let lesson = tree.lessons[0][0];
        let svc = tracker(Clock::fixed(fixed_now()), &repo);

        svc.complete_lesson(user, lesson, None).await.unwrap();
        assert!(!svc.start_lesson(user, lesson).await.unwrap());

        let row = svc.lesson_progress(user, lesson).await.unwrap().unwrap();
        assert_eq!(row.status(), LessonStatus::Completed);
    }

    #[tokio::test]
    async fn completing_without_score_keeps_previous_score() {
        let repo = InMemoryRepository::new();
        let tree = CurriculumBuilder::new().topic(1).build(&repo).await;
        let user = UserId::random();
        let lesson = tree.lessons[0][0];
        let svc = tracker(Clock::fixed(fixed_now()), &repo);

        svc.complete_lesson(user, lesson, Some(QuizScore::new(85.0).unwrap()))
            .await
            .unwrap();
        let report = svc.complete_lesson(user, lesson, None).await.unwrap();

        assert_eq!(report.progress.quiz_score().map(QuizScore::value), Some(85.0));
    }

    #[tokio::test]
    async fn completion_reports_updated_rollups() {
        let repo = InMemoryRepository::new();
        let tree = CurriculumBuilder::new().topic(2).topic(2).build(&repo).await;
        let user = UserId::random();
        let svc = tracker(Clock::fixed(fixed_now()), &repo);

        let report = svc
            .complete_lesson(user, tree.lessons[0][0], None)
            .await
            .unwrap();

        let RollupStatus::Updated(RollupOutcome::Updated { topic, subject }) = &report.rollup else {
            panic!("expected updated rollup, got {:?}", report.rollup);
        };
        assert_eq!(topic.percent, pct(50));
        assert_eq!(subject.percent, pct(25));
    }

    #[tokio::test]
    async fn completion_of_uncatalogued_lesson_is_stored_and_skipped() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let lesson = LessonId::random();
        let svc = tracker(Clock::fixed(fixed_now()), &repo);

        let report = svc.complete_lesson(user, lesson, None).await.unwrap();

        assert_eq!(report.rollup.as_str(), "skipped");
        assert!(report.progress.is_completed());
        assert!(repo.get_lesson_progress(user, lesson).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rollup_failure_does_not_undo_completion() {
        let repo = InMemoryRepository::new();
        let tree = CurriculumBuilder::new().topic(2).build(&repo).await;
        let user = UserId::random();
        let lesson = tree.lessons[0][0];
        let svc = tracker_with(
            Clock::fixed(fixed_now()),
            &repo,
            Arc::new(SubjectWritesFail(repo.clone())),
        );

        let report = svc.complete_lesson(user, lesson, None).await.unwrap();

        assert!(report.rollup.is_failed());
        let row = repo.get_lesson_progress(user, lesson).await.unwrap().unwrap();
        assert_eq!(row.status(), LessonStatus::Completed);
        // the topic step ran before the failing subject step
        let topics = repo.topic_percents(user, &tree.topics).await.unwrap();
        assert_eq!(topics[&tree.topics[0]], pct(50));
        assert!(repo.list_subject_progress(user).await.unwrap().is_empty());
    }
}
