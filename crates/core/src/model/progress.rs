use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, SubjectId, TopicId, UserId};
use crate::model::percent::Percent;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("quiz score must be between 0 and 100, got {0}")]
    InvalidQuizScore(f64),

    #[error("invalid lesson status: {0}")]
    InvalidStatus(String),

    #[error("completed lesson is missing completed_at")]
    MissingCompletedAt,
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Engagement state of a user with a single lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    NotStarted,
    Started,
    Completed,
}

impl LessonStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonStatus::NotStarted => "not_started",
            LessonStatus::Started => "started",
            LessonStatus::Completed => "completed",
        }
    }

    /// Parse the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidStatus` for unknown values.
    pub fn parse(value: &str) -> Result<Self, ProgressError> {
        match value {
            "not_started" => Ok(LessonStatus::NotStarted),
            "started" => Ok(LessonStatus::Started),
            "completed" => Ok(LessonStatus::Completed),
            other => Err(ProgressError::InvalidStatus(other.to_string())),
        }
    }
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// Score of the quiz attached to a lesson, `0.0..=100.0`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct QuizScore(f64);

impl QuizScore {
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidQuizScore` for non-finite or out-of-range values.
    pub fn new(value: f64) -> Result<Self, ProgressError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ProgressError::InvalidQuizScore(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// A request to mark a lesson completed for a user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LessonCompletion {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub quiz_score: Option<QuizScore>,
    pub completed_at: DateTime<Utc>,
}

/// Per-(user, lesson) completion record. Leaf fact of all rollups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    status: LessonStatus,
    quiz_score: Option<QuizScore>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// First engagement with a lesson.
    #[must_use]
    pub fn started(user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            status: LessonStatus::Started,
            quiz_score: None,
            started_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Row created by a completion for a lesson that was never started.
    #[must_use]
    pub fn completed(completion: &LessonCompletion) -> Self {
        Self {
            user_id: completion.user_id,
            lesson_id: completion.lesson_id,
            status: LessonStatus::Completed,
            quiz_score: completion.quiz_score,
            started_at: completion.completed_at,
            completed_at: Some(completion.completed_at),
            updated_at: completion.completed_at,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingCompletedAt` if a completed row has no completion time.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        lesson_id: LessonId,
        status: LessonStatus,
        quiz_score: Option<QuizScore>,
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if status == LessonStatus::Completed && completed_at.is_none() {
            return Err(ProgressError::MissingCompletedAt);
        }
        Ok(Self {
            user_id,
            lesson_id,
            status,
            quiz_score,
            started_at,
            completed_at,
            updated_at,
        })
    }

    /// Apply a completion on top of an existing row.
    ///
    /// A completion without a score keeps the previously stored score.
    pub fn apply_completion(&mut self, completion: &LessonCompletion) {
        self.status = LessonStatus::Completed;
        self.completed_at = Some(completion.completed_at);
        self.updated_at = completion.completed_at;
        if completion.quiz_score.is_some() {
            self.quiz_score = completion.quiz_score;
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn status(&self) -> LessonStatus {
        self.status
    }

    #[must_use]
    pub fn quiz_score(&self) -> Option<QuizScore> {
        self.quiz_score
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

//
// ─── DERIVED ROLLUPS ───────────────────────────────────────────────────────────
//

/// Materialized completion of one topic for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicProgress {
    pub user_id: UserId,
    pub topic_id: TopicId,
    pub percent: Percent,
    pub updated_at: DateTime<Utc>,
}

/// Materialized completion of one subject for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectProgress {
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub percent: Percent,
    pub updated_at: DateTime<Utc>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
