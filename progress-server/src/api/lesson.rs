//! LessonService - lesson progress endpoints
//!
//! Endpoints:
//! - POST /progress.LessonService/StartLesson
//! - POST /progress.LessonService/RecordSection
//! - POST /progress.LessonService/CompleteLesson
//! - POST /progress.LessonService/CompleteExercise

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use progress_core::sections::SectionAttempt;
use progress_core::{LessonId, UserId, UserProgress};

use super::ApiState;
use crate::error::ServiceResult;
use crate::services::progress::{ExerciseAnswer, ExerciseOutcome};
use crate::services::LessonCompletion;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/progress.LessonService/StartLesson", post(start_lesson))
        .route("/progress.LessonService/RecordSection", post(record_section))
        .route("/progress.LessonService/CompleteLesson", post(complete_lesson))
        .route(
            "/progress.LessonService/CompleteExercise",
            post(complete_exercise),
        )
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct StartLessonRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
}

#[derive(Deserialize)]
pub struct RecordSectionRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    #[serde(flatten)]
    pub section: SectionAttempt,
}

#[derive(Deserialize)]
pub struct CompleteLessonRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub score: u8,
    /// Seconds
    #[serde(default)]
    pub time_spent: u32,
}

#[derive(Deserialize)]
pub struct CompleteExerciseRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    #[serde(flatten)]
    pub answer: ExerciseAnswer,
}

// ============================================================================
// Handlers
// ============================================================================

async fn start_lesson(
    State(state): State<ApiState>,
    Json(req): Json<StartLessonRequest>,
) -> ServiceResult<Json<UserProgress>> {
    let progress = state
        .services
        .progress
        .start_lesson(req.user_id, req.lesson_id)
        .await?;
    Ok(Json(progress))
}

async fn record_section(
    State(state): State<ApiState>,
    Json(req): Json<RecordSectionRequest>,
) -> ServiceResult<Json<UserProgress>> {
    let progress = state
        .services
        .progress
        .record_section_progress(req.user_id, req.lesson_id, &req.section)
        .await?;
    Ok(Json(progress))
}

async fn complete_lesson(
    State(state): State<ApiState>,
    Json(req): Json<CompleteLessonRequest>,
) -> ServiceResult<Json<LessonCompletion>> {
    let completion = state
        .services
        .lessons
        .complete_lesson(req.user_id, req.lesson_id, req.score, req.time_spent)
        .await?;
    Ok(Json(completion))
}

async fn complete_exercise(
    State(state): State<ApiState>,
    Json(req): Json<CompleteExerciseRequest>,
) -> ServiceResult<Json<ExerciseOutcome>> {
    let outcome = state
        .services
        .progress
        .complete_exercise(req.user_id, req.lesson_id, &req.answer)
        .await?;
    Ok(Json(outcome))
}
