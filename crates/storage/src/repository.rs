use async_trait::async_trait;
use edu_core::model::{
    Lesson, LessonCompletion, LessonId, LessonPlacement, LessonProgress, Percent, Subject,
    SubjectId, SubjectProgress, Topic, TopicId, TopicProgress, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read/write access to the subject → topic → lesson tree.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Persist or update a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Resolve the topic and subject that own a lesson.
    ///
    /// Returns `Ok(None)` when the lesson (or its topic) is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn locate_lesson(&self, lesson_id: LessonId)
    -> Result<Option<LessonPlacement>, StorageError>;

    /// Number of lessons under a topic (0 for unknown topics).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn count_lessons(&self, topic_id: TopicId) -> Result<u32, StorageError>;

    /// Topics of a subject ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_topic_ids(&self, subject_id: SubjectId) -> Result<Vec<TopicId>, StorageError>;
}

/// Leaf facts: one row per (user, lesson).
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Insert a started row unless one already exists for (user, lesson).
    ///
    /// Returns `true` when a row was created. Existing rows are never touched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn insert_started(&self, progress: &LessonProgress) -> Result<bool, StorageError>;

    /// Atomically insert or update the row as completed and return what was stored.
    ///
    /// A completion without a quiz score keeps any previously stored score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<LessonProgress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend or decoding failures.
    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Lessons of `topic_id` the user has a completion time for.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn count_completed_in_topic(
        &self,
        user_id: UserId,
        topic_id: TopicId,
    ) -> Result<u32, StorageError>;
}

/// Materialized topic and subject percentages.
#[async_trait]
pub trait RollupRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError>;

    /// Stored percentages for the given topics. Topics without a row are absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend or decoding failures.
    async fn topic_percents(
        &self,
        user_id: UserId,
        topic_ids: &[TopicId],
    ) -> Result<HashMap<TopicId, Percent>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_subject_progress(&self, progress: &SubjectProgress)
    -> Result<(), StorageError>;

    /// All subject rows for a user; empty when nothing has been completed yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend or decoding failures.
    async fn list_subject_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubjectProgress>, StorageError>;
}

#[derive(Default)]
struct CatalogState {
    subjects: HashMap<SubjectId, Subject>,
    topics: HashMap<TopicId, Topic>,
    lessons: HashMap<LessonId, Lesson>,
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Every write happens under a single lock acquisition, which gives the same
/// atomic upsert behavior as the SQL adapters.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<CatalogState>>,
    lessons: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
    topics: Arc<Mutex<HashMap<(UserId, TopicId), TopicProgress>>>,
    subjects: Arc<Mutex<HashMap<(UserId, SubjectId), SubjectProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: ToString>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        guard.subjects.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        guard.topics.insert(topic.id(), topic.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn locate_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonPlacement>, StorageError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        let placement = guard.lessons.get(&lesson_id).and_then(|lesson| {
            guard.topics.get(&lesson.topic_id()).map(|topic| LessonPlacement {
                lesson_id,
                topic_id: topic.id(),
                subject_id: topic.subject_id(),
            })
        });
        Ok(placement)
    }

    async fn count_lessons(&self, topic_id: TopicId) -> Result<u32, StorageError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        let count = guard
            .lessons
            .values()
            .filter(|l| l.topic_id() == topic_id)
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("lesson count overflow".into()))
    }

    async fn list_topic_ids(&self, subject_id: SubjectId) -> Result<Vec<TopicId>, StorageError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        let mut topics: Vec<&Topic> = guard
            .topics
            .values()
            .filter(|t| t.subject_id() == subject_id)
            .collect();
        topics.sort_by_key(|t| (t.position(), t.id()));
        Ok(topics.into_iter().map(Topic::id).collect())
    }
}

#[async_trait]
impl LessonProgressRepository for InMemoryRepository {
    async fn insert_started(&self, progress: &LessonProgress) -> Result<bool, StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        let key = (progress.user_id(), progress.lesson_id());
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(key, progress.clone());
        Ok(true)
    }

    async fn upsert_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<LessonProgress, StorageError> {
        let mut guard = self.lessons.lock().map_err(poisoned)?;
        let stored = guard
            .entry((completion.user_id, completion.lesson_id))
            .and_modify(|existing| existing.apply_completion(completion))
            .or_insert_with(|| LessonProgress::completed(completion));
        Ok(stored.clone())
    }

    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.lessons.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, lesson_id)).cloned())
    }

    async fn count_completed_in_topic(
        &self,
        user_id: UserId,
        topic_id: TopicId,
    ) -> Result<u32, StorageError> {
        let lesson_ids: Vec<LessonId> = {
            let catalog = self.catalog.lock().map_err(poisoned)?;
            catalog
                .lessons
                .values()
                .filter(|l| l.topic_id() == topic_id)
                .map(Lesson::id)
                .collect()
        };
        let guard = self.lessons.lock().map_err(poisoned)?;
        let count = lesson_ids
            .into_iter()
            .filter(|id| {
                guard
                    .get(&(user_id, *id))
                    .is_some_and(LessonProgress::is_completed)
            })
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("lesson count overflow".into()))
    }
}

#[async_trait]
impl RollupRepository for InMemoryRepository {
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        let mut guard = self.topics.lock().map_err(poisoned)?;
        guard.insert((progress.user_id, progress.topic_id), *progress);
        Ok(())
    }

    async fn topic_percents(
        &self,
        user_id: UserId,
        topic_ids: &[TopicId],
    ) -> Result<HashMap<TopicId, Percent>, StorageError> {
        let guard = self.topics.lock().map_err(poisoned)?;
        Ok(topic_ids
            .iter()
            .filter_map(|id| guard.get(&(user_id, *id)).map(|row| (*id, row.percent)))
            .collect())
    }

    async fn upsert_subject_progress(
        &self,
        progress: &SubjectProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.subjects.lock().map_err(poisoned)?;
        guard.insert((progress.user_id, progress.subject_id), *progress);
        Ok(())
    }

    async fn list_subject_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubjectProgress>, StorageError> {
        let guard = self.subjects.lock().map_err(poisoned)?;
        let mut rows: Vec<SubjectProgress> = guard
            .values()
            .filter(|row| row.user_id == user_id)
            .copied()
            .collect();
        rows.sort_by_key(|row| row.subject_id);
        Ok(rows)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub lesson_progress: Arc<dyn LessonProgressRepository>,
    pub rollups: Arc<dyn RollupRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Use one repository value for every role.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CatalogRepository + LessonProgressRepository + RollupRepository + Clone + 'static,
    {
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let lesson_progress: Arc<dyn LessonProgressRepository> = Arc::new(repo.clone());
        let rollups: Arc<dyn RollupRepository> = Arc::new(repo);
        Self {
            catalog,
            lesson_progress,
            rollups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edu_core::model::{LessonStatus, QuizScore, Title};
    use edu_core::time::fixed_now;

    struct Fixture {
        repo: InMemoryRepository,
        subject: SubjectId,
        topic: TopicId,
        lessons: Vec<LessonId>,
    }

    async fn fixture(lesson_count: u32) -> Fixture {
        let repo = InMemoryRepository::new();
        let subject = SubjectId::random();
        let topic = TopicId::random();
        repo.upsert_subject(&Subject::new(subject, Title::new("Maths").unwrap()))
            .await
            .unwrap();
        repo.upsert_topic(&Topic::new(topic, subject, Title::new("Algebra").unwrap(), 0))
            .await
            .unwrap();
        let mut lessons = Vec::new();
        for pos in 0..lesson_count {
            let id = LessonId::random();
            repo.upsert_lesson(&Lesson::new(id, topic, Title::new(format!("L{pos}")).unwrap(), pos))
                .await
                .unwrap();
            lessons.push(id);
        }
        Fixture {
            repo,
            subject,
            topic,
            lessons,
        }
    }

    #[tokio::test]
    async fn insert_started_is_insert_if_absent() {
        let fx = fixture(1).await;
        let user = UserId::random();
        let first = LessonProgress::started(user, fx.lessons[0], fixed_now());
        assert!(fx.repo.insert_started(&first).await.unwrap());

        let later = LessonProgress::started(
            user,
            fx.lessons[0],
            fixed_now() + chrono::Duration::hours(1),
        );
        assert!(!fx.repo.insert_started(&later).await.unwrap());

        let stored = fx
            .repo
            .get_lesson_progress(user, fx.lessons[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.started_at(), fixed_now());
        assert_eq!(stored.status(), LessonStatus::Started);
    }

    #[tokio::test]
    async fn upsert_completion_preserves_score_and_counts_completed() {
        let fx = fixture(3).await;
        let user = UserId::random();
        let completion = LessonCompletion {
            user_id: user,
            lesson_id: fx.lessons[0],
            quiz_score: Some(QuizScore::new(85.0).unwrap()),
            completed_at: fixed_now(),
        };
        fx.repo.upsert_completion(&completion).await.unwrap();
        let stored = fx
            .repo
            .upsert_completion(&LessonCompletion {
                quiz_score: None,
                ..completion
            })
            .await
            .unwrap();
        assert_eq!(stored.quiz_score().map(QuizScore::value), Some(85.0));

        // a started-only lesson does not count
        fx.repo
            .insert_started(&LessonProgress::started(user, fx.lessons[1], fixed_now()))
            .await
            .unwrap();
        assert_eq!(
            fx.repo.count_completed_in_topic(user, fx.topic).await.unwrap(),
            1
        );
        assert_eq!(fx.repo.count_lessons(fx.topic).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn locate_lesson_walks_up_the_tree() {
        let fx = fixture(1).await;
        let placement = fx.repo.locate_lesson(fx.lessons[0]).await.unwrap().unwrap();
        assert_eq!(placement.topic_id, fx.topic);
        assert_eq!(placement.subject_id, fx.subject);
        assert!(
            fx.repo
                .locate_lesson(LessonId::random())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn subject_progress_is_scoped_per_user() {
        let fx = fixture(0).await;
        let alice = UserId::random();
        let bob = UserId::random();
        fx.repo
            .upsert_subject_progress(&SubjectProgress {
                user_id: alice,
                subject_id: fx.subject,
                percent: Percent::new(40).unwrap(),
                updated_at: fixed_now(),
            })
            .await
            .unwrap();

        assert_eq!(fx.repo.list_subject_progress(alice).await.unwrap().len(), 1);
        assert!(fx.repo.list_subject_progress(bob).await.unwrap().is_empty());
    }
}
