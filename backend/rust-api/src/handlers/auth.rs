use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{LoginRequest, RegisterRequest},
    services::{auth_service::AuthService, ApiError, AppState},
};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.store.clone(),
        JwtService::new(&state.config.jwt_secret),
    )
}

/// POST /api/auth/register - Register a new user
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Registering new user: {}", req.email);

    let response = auth_service(&state).register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful",
            "access_token": response.access_token,
            "user": response.user,
        })),
    ))
}

/// POST /api/auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Login attempt: {}", req.email);

    let response = auth_service(&state).login(req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "access_token": response.access_token,
        "user": response.user,
    })))
}

/// GET /api/auth/me - Current user profile
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = auth_service(&state).current_user(&claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "user": user,
    })))
}
