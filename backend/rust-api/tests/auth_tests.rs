use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_register_defaults_to_student_role() {
    let app = common::create_test_app().await;

    let email = format!("student-{}@test.com", Uuid::new_v4());
    let body = json!({
        "email": email,
        "password": "Passw0rd!123",
        "name": "Plain Student",
    });

    let (status, json) = common::request(&app, "POST", "/api/auth/register", None, Some(body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["user"]["role"], "student");
    assert!(json["access_token"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let app = common::create_test_app().await;

    let email = format!("dup-{}@test.com", Uuid::new_v4());
    let body = json!({
        "email": email,
        "password": "Passw0rd!123",
        "name": "First",
    });

    let (status, _) =
        common::request(&app, "POST", "/api/auth/register", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = common::request(&app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("already exists"));
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let app = common::create_test_app().await;

    let body = json!({
        "email": format!("sneaky-{}@test.com", Uuid::new_v4()),
        "password": "Passw0rd!123",
        "name": "Sneaky",
        "role": "admin",
    });

    let (status, _) = common::request(&app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_validates_email_and_password() {
    let app = common::create_test_app().await;

    let body = json!({
        "email": "not-an-email",
        "password": "Passw0rd!123",
        "name": "Someone",
    });
    let (status, _) = common::request(&app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = json!({
        "email": format!("short-{}@test.com", Uuid::new_v4()),
        "password": "short",
        "name": "Someone",
    });
    let (status, _) = common::request(&app, "POST", "/api/auth/register", None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_me_roundtrip() {
    let app = common::create_test_app().await;

    let email = format!("login-{}@test.com", Uuid::new_v4());
    let register_body = json!({
        "email": email,
        "password": "Passw0rd!123",
        "name": "Login User",
        "role": "instructor",
    });
    let (status, _) =
        common::request(&app, "POST", "/api/auth/register", None, Some(register_body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let login_body = json!({
        "email": email,
        "password": "Passw0rd!123",
    });
    let (status, json) =
        common::request(&app, "POST", "/api/auth/login", None, Some(login_body)).await;
    assert_eq!(status, StatusCode::OK);
    let token = json["access_token"].as_str().unwrap().to_string();

    let (status, json) = common::request(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["email"], email.to_lowercase());
    assert_eq!(json["user"]["role"], "instructor");
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let app = common::create_test_app().await;

    let email = format!("wrongpw-{}@test.com", Uuid::new_v4());
    let register_body = json!({
        "email": email,
        "password": "Passw0rd!123",
        "name": "User",
    });
    let (status, _) =
        common::request(&app, "POST", "/api/auth/register", None, Some(register_body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let login_body = json!({
        "email": email,
        "password": "WrongPassword!",
    });
    let (status, json) =
        common::request(&app, "POST", "/api/auth/login", None, Some(login_body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = common::create_test_app().await;

    let (status, _) = common::request(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
