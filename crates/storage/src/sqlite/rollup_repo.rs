use std::collections::HashMap;

use edu_core::model::{Percent, SubjectProgress, TopicId, TopicProgress, UserId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{conn, id_column, percent_from_i64, percent_to_i64, ser},
};
use crate::repository::{RollupRepository, StorageError};

#[async_trait::async_trait]
impl RollupRepository for SqliteRepository {
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topic_progress (user_id, topic_id, percent_complete, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, topic_id) DO UPDATE SET
                percent_complete = excluded.percent_complete,
                updated_at = excluded.updated_at
            ",
        )
        .bind(progress.user_id.to_string())
        .bind(progress.topic_id.to_string())
        .bind(percent_to_i64(progress.percent))
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn topic_percents(
        &self,
        user_id: UserId,
        topic_ids: &[TopicId],
    ) -> Result<HashMap<TopicId, Percent>, StorageError> {
        if topic_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut sql = String::from(
            r"
            SELECT topic_id, percent_complete
            FROM topic_progress
            WHERE user_id = ?1 AND topic_id IN (
            ",
        );
        for i in 0..topic_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 2).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        for topic_id in topic_ids {
            query = query.bind(topic_id.to_string());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let topic_id: TopicId = id_column(&row, "topic_id")?;
            let percent = percent_from_i64(row.try_get("percent_complete").map_err(ser)?)?;
            out.insert(topic_id, percent);
        }
        Ok(out)
    }

    async fn upsert_subject_progress(
        &self,
        progress: &SubjectProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO subject_progress (user_id, subject_id, percent_complete, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, subject_id) DO UPDATE SET
                percent_complete = excluded.percent_complete,
                updated_at = excluded.updated_at
            ",
        )
        .bind(progress.user_id.to_string())
        .bind(progress.subject_id.to_string())
        .bind(percent_to_i64(progress.percent))
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_subject_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SubjectProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, subject_id, percent_complete, updated_at
            FROM subject_progress
            WHERE user_id = ?1
            ORDER BY subject_id ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SubjectProgress {
                user_id: id_column(&row, "user_id")?,
                subject_id: id_column(&row, "subject_id")?,
                percent: percent_from_i64(row.try_get("percent_complete").map_err(ser)?)?,
                updated_at: row.try_get("updated_at").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
