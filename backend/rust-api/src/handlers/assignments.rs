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
    models::submission::{GradeSubmissionRequest, SubmitAssignmentRequest},
    services::{submission_service::SubmissionService, ApiError, AppState},
};

fn submissions(state: &AppState) -> SubmissionService {
    SubmissionService::new(state.store.clone(), state.course_locks.clone())
}

/// POST /api/assignments/{id}/submissions - Hand in work. Late submissions
/// are accepted and flagged.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(assignment_id): Path<String>,
    AppJson(req): AppJson<SubmitAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = submissions(&state)
        .submit(&claims, &assignment_id, req)
        .await?;

    let message = if submission.is_late {
        "Assignment submitted successfully! (Late Submission)"
    } else {
        "Assignment submitted successfully!"
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": message,
            "submission": submission,
        })),
    ))
}

/// GET /api/assignments/{id}/submissions - All submissions (instructor)
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(assignment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let all = submissions(&state).list_submissions(&claims, &assignment_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": all.len(),
        "submissions": all,
    })))
}

/// GET /api/assignments/{id}/submissions/{studentId}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((assignment_id, student_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = submissions(&state)
        .get_submission(&claims, &assignment_id, &student_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "submission": submission,
    })))
}

/// PATCH /api/assignments/{id}/submissions/{studentId} - Edit before the due
/// date and before grading
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((assignment_id, student_id)): Path<(String, String)>,
    AppJson(req): AppJson<SubmitAssignmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = submissions(&state)
        .edit(&claims, &assignment_id, &student_id, req)
        .await?;

    let message = if submission.is_late {
        "Assignment updated successfully! (Late Submission)"
    } else {
        "Assignment updated successfully!"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "submission": submission,
    })))
}

/// POST /api/assignments/{id}/submissions/{studentId}/grade (instructor)
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((assignment_id, student_id)): Path<(String, String)>,
    AppJson(req): AppJson<GradeSubmissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = submissions(&state)
        .grade(&claims, &assignment_id, &student_id, req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Submission graded",
        "submission": submission,
    })))
}
