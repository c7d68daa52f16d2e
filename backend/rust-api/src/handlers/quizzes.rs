use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::quiz::AnswerRequest,
    services::{quiz_service::QuizService, ApiError, AppState},
};

fn quizzes(state: &AppState) -> QuizService {
    QuizService::new(state.store.clone(), state.course_locks.clone())
}

/// POST /api/quizzes/{id}/attempts - Start a fresh timed attempt. The
/// returned questions carry no answer keys; the deadline is authoritative.
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = quizzes(&state).start(&claims, &quiz_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "session": session,
        })),
    ))
}

/// PUT /api/quizzes/{id}/attempts/answer - Record one answer while the
/// attempt is in progress
pub async fn answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
    AppJson(req): AppJson<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = quizzes(&state).answer(&claims, &quiz_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "session": session,
    })))
}

/// POST /api/quizzes/{id}/attempts/submit - Score and persist the attempt
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let result = quizzes(&state).submit(&claims, &quiz_id).await?;

    Ok(Json(json!({
        "success": true,
        "result": result,
    })))
}

/// GET /api/quizzes/{id}/attempts - The caller's attempt history and best
/// score
pub async fn attempt_history(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(quiz_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let history = quizzes(&state).attempt_history(&claims, &quiz_id).await?;

    Ok(Json(json!({
        "success": true,
        "quiz_id": history.quiz_id,
        "attempted": history.attempted,
        "best_score": history.best_score,
        "attempts": history.attempts,
    })))
}
