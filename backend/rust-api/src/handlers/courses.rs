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
    models::course::{CreateCourseRequest, RateCourseRequest, UpdateCourseRequest},
    services::{
        catalog_service::CatalogService, enrollment_service::EnrollmentService, ApiError, AppState,
    },
};

fn catalog(state: &AppState) -> CatalogService {
    CatalogService::new(state.store.clone(), state.course_locks.clone())
}

fn enrollments(state: &AppState) -> EnrollmentService {
    EnrollmentService::new(
        state.store.clone(),
        state.course_locks.clone(),
        state.config.unenroll_grace_hours,
    )
}

/// GET /api/courses - All published & approved courses
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = catalog(&state).list_published().await?;

    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "courses": courses,
    })))
}

/// GET /api/courses/{id} - Single course detail. Owners and admins see
/// unpublished courses (and quiz answer keys); everyone else only published
/// ones.
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<JwtClaims>>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state)
        .get_course(claims.as_ref().map(|Extension(c)| c), &course_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "course": course,
    })))
}

/// POST /api/courses - Create a course (instructors only)
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state).create_course(&claims, req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Course created successfully",
            "course": course,
        })),
    ))
}

/// PUT /api/courses/{id} - Update a course (owner or admin)
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<UpdateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state)
        .update_course(&claims, &course_id, req)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Course updated successfully",
        "course": course,
    })))
}

/// GET /api/courses/instructor/my-courses
pub async fn my_courses(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let courses = catalog(&state).list_by_instructor(&claims).await?;

    Ok(Json(json!({
        "success": true,
        "count": courses.len(),
        "courses": courses,
    })))
}

/// POST /api/courses/{id}/publish
pub async fn publish_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state)
        .set_published(&claims, &course_id, true)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Course published",
        "course": course,
    })))
}

/// POST /api/courses/{id}/unpublish - Removes the course from the catalog;
/// already-enrolled students keep access.
pub async fn unpublish_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state)
        .set_published(&claims, &course_id, false)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Course unpublished",
        "course": course,
    })))
}

/// POST /api/courses/{id}/approve (admin only)
pub async fn approve_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state).approve(&claims, &course_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Course approved",
        "course": course,
    })))
}

/// POST /api/courses/{id}/ratings - Upsert the caller's rating
pub async fn rate_course(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
    AppJson(req): AppJson<RateCourseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let course = catalog(&state).rate(&claims, &course_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Rating saved",
        "average_rating": course.average_rating,
        "total_ratings": course.total_ratings,
        "course": course,
    })))
}

/// POST /api/courses/{id}/enroll
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let enrolled = enrollments(&state).enroll(&claims.sub, &course_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully enrolled in \"{}\"!", enrolled.title),
        "enrolled_course": enrolled,
    })))
}

/// DELETE /api/courses/{id}/enroll - Unenroll within the grace window
pub async fn unenroll(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(course_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    enrollments(&state).unenroll(&claims.sub, &course_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Successfully unenrolled",
    })))
}
