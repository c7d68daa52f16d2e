#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use edukendra_api::middlewares::auth::JwtService;
use edukendra_api::services::auth_service::AuthService;
use edukendra_api::store::MemoryStore;
use edukendra_api::{config::Config, create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub async fn create_test_app() -> Router {
    create_test_app_with_config(Config::for_tests()).await
}

/// Builds the full router over the in-memory gateway and seeds the admin
/// account from the test configuration.
pub async fn create_test_app_with_config(config: Config) -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let app_state = Arc::new(AppState::new(config, store));

    let auth_service = AuthService::new(
        app_state.store.clone(),
        JwtService::new(&app_state.config.jwt_secret),
    );
    auth_service
        .seed_admin(&app_state.config)
        .await
        .expect("Failed to seed test admin");

    create_router(app_state)
}

/// Sends one request and returns (status, parsed JSON body). An empty body
/// parses as JSON null.
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Registers a fresh user with the given role and returns (user_id, token)
pub async fn register_and_login(app: &Router, role: &str) -> (String, String) {
    let email = format!("{}-{}@test.com", role, Uuid::new_v4());
    let body = json!({
        "email": email,
        "password": "Passw0rd!123",
        "name": format!("Test {}", role),
        "role": role,
    });

    let (status, json) = request(app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);

    let user_id = json["user"]["id"].as_str().unwrap().to_string();
    let token = json["access_token"].as_str().unwrap().to_string();
    (user_id, token)
}

/// Logs in as the seeded admin from `Config::for_tests`
pub async fn admin_login(app: &Router) -> String {
    let body = json!({
        "email": "admin@test.local",
        "password": "AdminPassw0rd!",
    });

    let (status, json) = request(app, "POST", "/api/auth/login", None, Some(body)).await;
    assert_eq!(status, StatusCode::OK, "admin login failed: {}", json);
    json["access_token"].as_str().unwrap().to_string()
}

/// Minimal valid course payload: two lectures (45 + 30 minutes), no
/// assessments. Merge extra fields over it with [`merge`].
pub fn course_payload() -> Value {
    json!({
        "title": "Rust for Web Developers",
        "subtitle": "From zero to production services",
        "description": "A hands-on course about building web services in Rust.",
        "category": "web-development",
        "price": 0.0,
        "sections": [
            {
                "title": "Getting Started",
                "lectures": [
                    {
                        "title": "Introduction",
                        "description": "What we will build",
                        "video_url": "https://videos.test/intro.mp4",
                        "duration_minutes": 45
                    },
                    {
                        "title": "Toolchain setup",
                        "description": "Installing everything",
                        "video_url": "https://videos.test/setup.mp4",
                        "duration_minutes": 30
                    }
                ]
            }
        ]
    })
}

/// Shallow-merges `extra`'s top-level fields over `base`
pub fn merge(mut base: Value, extra: Value) -> Value {
    if let (Some(base_map), Some(extra_map)) = (base.as_object_mut(), extra.as_object()) {
        for (key, value) in extra_map {
            base_map.insert(key.clone(), value.clone());
        }
    }
    base
}

/// Creates a course as the given instructor, returning the course detail JSON
pub async fn create_course(app: &Router, instructor_token: &str, payload: Value) -> Value {
    let (status, json) = request(
        app,
        "POST",
        "/api/courses",
        Some(instructor_token),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create course failed: {}", json);
    json["course"].clone()
}

/// Publishes (instructor) and approves (admin) a course so students can
/// enroll
pub async fn publish_and_approve(app: &Router, instructor_token: &str, course_id: &str) {
    let (status, json) = request(
        app,
        "POST",
        &format!("/api/courses/{}/publish", course_id),
        Some(instructor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "publish failed: {}", json);

    let admin_token = admin_login(app).await;
    let (status, json) = request(
        app,
        "POST",
        &format!("/api/courses/{}/approve", course_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "approve failed: {}", json);
}

/// Instructor + published & approved course in one step. Returns
/// (instructor_id, instructor_token, course detail)
pub async fn setup_published_course(app: &Router, payload: Value) -> (String, String, Value) {
    let (instructor_id, instructor_token) = register_and_login(app, "instructor").await;
    let course = create_course(app, &instructor_token, payload).await;
    let course_id = course["id"].as_str().unwrap();
    publish_and_approve(app, &instructor_token, course_id).await;
    (instructor_id, instructor_token, course)
}

pub async fn enroll(app: &Router, token: &str, course_id: &str) -> (StatusCode, Value) {
    request(
        app,
        "POST",
        &format!("/api/courses/{}/enroll", course_id),
        Some(token),
        None,
    )
    .await
}
