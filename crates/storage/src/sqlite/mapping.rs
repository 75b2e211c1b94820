use std::str::FromStr;

use edu_core::model::{LessonProgress, LessonStatus, Percent, QuizScore};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Reads a TEXT column holding a hyphenated UUID into one of the id newtypes.
pub(crate) fn id_column<T>(row: &SqliteRow, column: &str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(ser)?;
    raw.parse::<T>().map_err(ser)
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn percent_from_i64(v: i64) -> Result<Percent, StorageError> {
    u8::try_from(v)
        .ok()
        .and_then(Percent::new)
        .ok_or_else(|| StorageError::Serialization(format!("invalid percent_complete: {v}")))
}

pub(crate) fn percent_to_i64(p: Percent) -> i64 {
    i64::from(p.value())
}

pub(crate) fn map_lesson_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let quiz_score = row
        .try_get::<Option<f64>, _>("quiz_score")
        .map_err(ser)?
        .map(QuizScore::new)
        .transpose()
        .map_err(ser)?;

    LessonProgress::from_persisted(
        id_column(row, "user_id")?,
        id_column(row, "lesson_id")?,
        LessonStatus::parse(&status).map_err(ser)?,
        quiz_score,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}
