use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::Config;
use crate::store::DocumentStore;

pub mod auth_service;
pub mod catalog_service;
pub mod enrollment_service;
pub mod progress_service;
pub mod quiz_service;
pub mod submission_service;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub course_locks: Arc<CourseLocks>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            store,
            course_locks: Arc::new(CourseLocks::default()),
        }
    }
}

/// Per-course serialization point. Course aggregates (seat counts, rating
/// aggregates) and the shared per-assignment / per-quiz lists are updated by
/// read-modify-write, so every such update must run under the owning
/// course's lock.
#[derive(Default)]
pub struct CourseLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CourseLocks {
    pub async fn acquire(&self, course_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.inner.lock().expect("course lock registry poisoned");
            registry
                .entry(course_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Domain errors surfaced to clients. All recoverable at the caller; only
/// `Storage` hides its detail behind a generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("Course is not available for enrollment")]
    NotPublished,
    #[error("You are already enrolled in this course")]
    AlreadyEnrolled,
    #[error("No seats are available for this course")]
    SeatsExhausted,
    #[error("Course not found in enrolled courses")]
    NotEnrolled,
    #[error("The unenrollment grace period has expired")]
    GracePeriodExpired,
    #[error("Submission must include a text answer or a file")]
    EmptySubmission,
    #[error("Submission can no longer be edited")]
    NotEditable,
    #[error("No submission found for this student")]
    NoSubmission,
    #[error("{0}")]
    InvalidPoints(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::NotEnrolled | ApiError::NoSubmission => {
                StatusCode::NOT_FOUND
            }
            ApiError::NotPublished
            | ApiError::AlreadyEnrolled
            | ApiError::SeatsExhausted
            | ApiError::GracePeriodExpired
            | ApiError::EmptySubmission
            | ApiError::NotEditable
            | ApiError::InvalidPoints(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(err) => {
                tracing::error!("Storage error: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "success": false,
                "message": message,
            })),
        )
            .into_response()
    }
}
