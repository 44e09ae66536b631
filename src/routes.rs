// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, catalog, quiz, record},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, identify_middleware},
};

/// Assembles the main application router.
///
/// * Public catalog browsing and auth.
/// * Attempts (present/submit) with optional identity.
/// * Record history behind auth, catalog management behind auth + admin.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let course_routes = Router::new()
        .route("/", get(catalog::list_courses))
        .route("/{id}", get(catalog::get_course))
        .merge(
            Router::new()
                .route("/{id}/quizzes", get(quiz::present_course))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    identify_middleware,
                )),
        );

    let quiz_routes = Router::new()
        .route("/submit", post(quiz::submit_test))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identify_middleware,
        ));

    let record_routes = Router::new()
        .route("/", get(record::list_my_records))
        .route("/{id}", get(record::get_record))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/categories", post(admin::create_category))
        .route(
            "/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/courses", post(admin::create_course))
        .route(
            "/courses/{id}",
            put(admin::update_course).delete(admin::delete_course),
        )
        .route(
            "/quizzes",
            get(admin::list_quizzes).post(admin::create_quiz),
        )
        .route(
            "/quizzes/{id}",
            get(admin::get_quiz)
                .put(admin::update_quiz)
                .delete(admin::delete_quiz),
        )
        .route("/records", get(record::list_all_records))
        // Auth runs first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .route("/api/categories", get(catalog::list_categories))
        .nest("/api/courses", course_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/records", record_routes)
        .nest("/api/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
