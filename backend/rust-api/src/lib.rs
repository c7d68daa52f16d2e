use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api/auth", auth_routes(app_state.clone()))
        .nest("/api/courses", course_routes(app_state.clone()))
        .nest(
            "/api/users",
            user_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/assignments",
            assignment_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/quizzes",
            quiz_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::me))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn course_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Catalog reads are public; a token (when present) lets owners and
    // admins see their unpublished courses.
    let public_routes = Router::new()
        .route("/", get(handlers::courses::list_courses))
        .route("/{id}", get(handlers::courses::get_course))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::optional_auth_middleware,
        ));

    let protected_routes = Router::new()
        .route("/", post(handlers::courses::create_course))
        .route("/{id}", put(handlers::courses::update_course))
        .route("/instructor/my-courses", get(handlers::courses::my_courses))
        .route("/{id}/publish", post(handlers::courses::publish_course))
        .route("/{id}/unpublish", post(handlers::courses::unpublish_course))
        .route("/{id}/approve", post(handlers::courses::approve_course))
        .route("/{id}/ratings", post(handlers::courses::rate_course))
        .route(
            "/{id}/enroll",
            post(handlers::courses::enroll).delete(handlers::courses::unenroll),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}

fn user_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/enrolled-courses", get(handlers::users::enrolled_courses))
        .route("/stats", get(handlers::users::learning_stats))
        .route(
            "/course-progress/{course_id}",
            put(handlers::users::set_course_progress),
        )
        .route(
            "/course-progress/{course_id}/lectures/{lecture_id}/complete",
            post(handlers::users::complete_lecture),
        )
        .route(
            "/course-progress/{course_id}/lectures/{lecture_id}/watch",
            post(handlers::users::record_watch_progress),
        )
}

fn assignment_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/{id}/submissions",
            post(handlers::assignments::submit).get(handlers::assignments::list),
        )
        .route(
            "/{id}/submissions/{student_id}",
            get(handlers::assignments::get).patch(handlers::assignments::edit),
        )
        .route(
            "/{id}/submissions/{student_id}/grade",
            post(handlers::assignments::grade),
        )
}

fn quiz_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/{id}/attempts",
            post(handlers::quizzes::start_attempt).get(handlers::quizzes::attempt_history),
        )
        .route("/{id}/attempts/answer", put(handlers::quizzes::answer))
        .route("/{id}/attempts/submit", post(handlers::quizzes::submit_attempt))
}
