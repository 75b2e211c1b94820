use edu_core::model::{Lesson, LessonId, LessonPlacement, Subject, SubjectId, Topic, TopicId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, count_from_i64, id_column, ser},
};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subjects (id, title)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET title = excluded.title
            ",
        )
        .bind(subject.id().to_string())
        .bind(subject.title().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (id, subject_id, title, position)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                subject_id = excluded.subject_id,
                title = excluded.title,
                position = excluded.position
            ",
        )
        .bind(topic.id().to_string())
        .bind(topic.subject_id().to_string())
        .bind(topic.title().as_str())
        .bind(i64::from(topic.position()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, topic_id, title, position)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                topic_id = excluded.topic_id,
                title = excluded.title,
                position = excluded.position
            ",
        )
        .bind(lesson.id().to_string())
        .bind(lesson.topic_id().to_string())
        .bind(lesson.title().as_str())
        .bind(i64::from(lesson.position()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn locate_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<LessonPlacement>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT l.topic_id AS topic_id, t.subject_id AS subject_id
            FROM lessons l
            JOIN topics t ON t.id = l.topic_id
            WHERE l.id = ?1
            ",
        )
        .bind(lesson_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.map(|row| {
            Ok(LessonPlacement {
                lesson_id,
                topic_id: id_column(&row, "topic_id")?,
                subject_id: id_column(&row, "subject_id")?,
            })
        })
        .transpose()
    }

    async fn count_lessons(&self, topic_id: TopicId) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM lessons WHERE topic_id = ?1")
            .bind(topic_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        count_from_i64("lesson count", row.try_get("total").map_err(ser)?)
    }

    async fn list_topic_ids(&self, subject_id: SubjectId) -> Result<Vec<TopicId>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id FROM topics
            WHERE subject_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(subject_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(id_column(&row, "id")?);
        }
        Ok(out)
    }
}
