use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::enrollment::{SetProgressRequest, WatchProgressRequest},
    services::{
        enrollment_service::EnrollmentService, progress_service::ProgressService, ApiError,
        AppState,
    },
};

fn enrollments(state: &AppState) -> EnrollmentService {
    EnrollmentService::new(
        state.store.clone(),
        state.course_locks.clone(),
        state.config.unenroll_grace_hours,
    )
}

/// GET /api/users/enrolled-courses
pub async fn enrolled_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = enrollments(&state).list_enrolled(&claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "courses": courses,
    })))
}

/// GET /api/users/stats - Learning statistics across enrollments
pub async fn learning_stats(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = enrollments(&state).learning_stats(&claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "stats": stats,
    })))
}

/// PUT /api/users/course-progress/{courseId} - Direct progress write.
/// Progress is clamped to [0, 100]; completed=true forces 100.
pub async fn set_course_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<SetProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let enrollment = enrollments(&state)
        .set_progress(&claims.sub, &course_id, req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Progress updated successfully",
        "progress": enrollment.progress,
        "completed": enrollment.completed,
    })))
}

/// POST /api/users/course-progress/{courseId}/lectures/{lectureId}/complete
pub async fn complete_lecture(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((course_id, lecture_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.store.clone());
    let (enrollment, lecture_progress) = service
        .mark_complete(&claims.sub, &course_id, &lecture_id, "manual")
        .await?;

    Ok(Json(json!({
        "success": true,
        "progress": enrollment.progress,
        "completed": enrollment.completed,
        "completed_lectures": lecture_progress.completed_lecture_ids,
    })))
}

/// POST /api/users/course-progress/{courseId}/lectures/{lectureId}/watch
/// Watch-position report; >= 95% watched counts as completion.
pub async fn record_watch_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path((course_id, lecture_id)): Path<(String, String)>,
    AppJson(req): AppJson<WatchProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.store.clone());
    let (enrollment, lecture_progress) = service
        .record_watch_progress(&claims.sub, &course_id, &lecture_id, req.fraction_watched)
        .await?;

    Ok(Json(json!({
        "success": true,
        "progress": enrollment.progress,
        "completed": enrollment.completed,
        "completed_lectures": lecture_progress.completed_lecture_ids,
    })))
}
