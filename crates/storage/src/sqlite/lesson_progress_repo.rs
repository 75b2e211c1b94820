use edu_core::model::{
    LessonCompletion, LessonId, LessonProgress, LessonStatus, QuizScore, TopicId, UserId,
};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, count_from_i64, map_lesson_progress_row, ser},
};
use crate::repository::{LessonProgressRepository, StorageError};

#[async_trait::async_trait]
impl LessonProgressRepository for SqliteRepository {
    async fn insert_started(&self, progress: &LessonProgress) -> Result<bool, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO lesson_progress (
                user_id, lesson_id, status, quiz_score, started_at, completed_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(user_id, lesson_id) DO NOTHING
            ",
        )
        .bind(progress.user_id().to_string())
        .bind(progress.lesson_id().to_string())
        .bind(progress.status().as_str())
        .bind(progress.quiz_score().map(QuizScore::value))
        .bind(progress.started_at())
        .bind(progress.completed_at())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.rows_affected() == 1)
    }

    async fn upsert_completion(
        &self,
        completion: &LessonCompletion,
    ) -> Result<LessonProgress, StorageError> {
        let row = sqlx::query(
            r"
            INSERT INTO lesson_progress (
                user_id, lesson_id, status, quiz_score, started_at, completed_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                -- started_at stays from the first insert
                status = excluded.status,
                quiz_score = COALESCE(excluded.quiz_score, lesson_progress.quiz_score),
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            RETURNING
                user_id, lesson_id, status, quiz_score, started_at, completed_at, updated_at
            ",
        )
        .bind(completion.user_id.to_string())
        .bind(completion.lesson_id.to_string())
        .bind(LessonStatus::Completed.as_str())
        .bind(completion.quiz_score.map(QuizScore::value))
        .bind(completion.completed_at)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        map_lesson_progress_row(&row)
    }

    async fn get_lesson_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                user_id, lesson_id, status, quiz_score, started_at, completed_at, updated_at
            FROM lesson_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_lesson_progress_row).transpose()
    }

    async fn count_completed_in_topic(
        &self,
        user_id: UserId,
        topic_id: TopicId,
    ) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS completed
            FROM lesson_progress lp
            JOIN lessons l ON l.id = lp.lesson_id
            WHERE lp.user_id = ?1
              AND l.topic_id = ?2
              AND lp.completed_at IS NOT NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(topic_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        count_from_i64("completed count", row.try_get("completed").map_err(ser)?)
    }
}
