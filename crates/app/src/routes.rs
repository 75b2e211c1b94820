use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use edu_core::model::{LessonId, LessonProgress, QuizScore, SubjectId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    user_id: UserId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    user_id: UserId,
    #[serde(default)]
    quiz_score: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    user_id: String,
}

#[derive(Serialize)]
pub struct StartResponse {
    success: bool,
    created: bool,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    success: bool,
    rollup: &'static str,
}

fn parse_id<T: FromStr>(raw: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::MalformedRequest(e.to_string()))
}

/// Lessons must exist before progress can be recorded against them.
async fn require_lesson(state: &AppState, raw: &str) -> Result<LessonId, AppError> {
    let lesson_id: LessonId = parse_id(raw)?;
    state
        .services
        .catalog()
        .locate_lesson(lesson_id)
        .await?
        .ok_or(AppError::LessonNotFound)?;
    Ok(lesson_id)
}

/// `POST /progress/lessons/{lesson_id}/start`
pub async fn start_lesson_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    payload: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<StartResponse>, AppError> {
    let Json(payload) = payload?;
    let lesson_id = require_lesson(&state, &lesson_id).await?;
    let created = state
        .services
        .tracker()
        .start_lesson(payload.user_id, lesson_id)
        .await?;
    Ok(Json(StartResponse {
        success: true,
        created,
    }))
}

/// `POST /progress/lessons/{lesson_id}/complete`
///
/// Answers 200 once the completion is stored, even if the rollup step failed;
/// `rollup` tells the caller which happened.
pub async fn complete_lesson_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<CompleteResponse>, AppError> {
    let Json(payload) = payload?;
    let quiz_score = payload.quiz_score.map(QuizScore::new).transpose()?;
    let lesson_id = require_lesson(&state, &lesson_id).await?;
    let report = state
        .services
        .tracker()
        .complete_lesson(payload.user_id, lesson_id, quiz_score)
        .await?;
    Ok(Json(CompleteResponse {
        success: true,
        rollup: report.rollup.as_str(),
    }))
}

/// `GET /progress/dashboard?userId=`
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BTreeMap<String, u8>>, AppError> {
    let user_id: UserId = parse_id(&query.user_id)?;
    let progress = state
        .services
        .dashboard()
        .dashboard_progress(user_id)
        .await?;
    Ok(Json(
        progress
            .into_iter()
            .map(|(subject, percent)| (subject.to_string(), percent.value()))
            .collect(),
    ))
}

/// `GET /progress/lessons/{lesson_id}?userId=`
pub async fn lesson_progress_handler(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<LessonProgress>, AppError> {
    let user_id: UserId = parse_id(&query.user_id)?;
    let lesson_id: LessonId = parse_id(&lesson_id)?;
    state
        .services
        .tracker()
        .lesson_progress(user_id, lesson_id)
        .await?
        .map(Json)
        .ok_or(AppError::ProgressNotFound)
}

/// `GET /progress/subjects/{subject_id}/topics?userId=`
pub async fn topic_breakdown_handler(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BTreeMap<String, u8>>, AppError> {
    let user_id: UserId = parse_id(&query.user_id)?;
    let subject_id: SubjectId = parse_id(&subject_id)?;
    let topics = state
        .services
        .dashboard()
        .topic_breakdown(user_id, subject_id)
        .await?;
    Ok(Json(
        topics
            .into_iter()
            .map(|(topic, percent)| (topic.to_string(), percent.value()))
            .collect(),
    ))
}
