// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, quiz, results, student, upload},
    state::AppState,
    utils::{
        jwt::{student_middleware, teacher_middleware},
        upload::UPLOAD_URL_PREFIX,
    },
};

/// Multipart framing allowance on top of the image ceiling, so an oversized
/// image is rejected by the handler with a readable message.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Assembles the main application router.
///
/// * `/api/teacher`: registration, login and the protected quiz workspace.
/// * `/api/quizzes`: public, answer-free quiz views.
/// * `/api/student`: registration and the protected take/submit/result flow.
/// * `/uploads`: stored question images.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let teacher_routes = Router::new()
        .route("/register", post(auth::register_teacher))
        .route("/login", post(auth::login_teacher))
        // Protected teacher routes
        .merge(
            Router::new()
                .route(
                    "/quizzes",
                    get(quiz::list_teacher_quizzes).post(quiz::create_quiz),
                )
                .route(
                    "/quizzes/{id}",
                    get(quiz::get_teacher_quiz)
                        .put(quiz::update_quiz)
                        .delete(quiz::delete_quiz),
                )
                .route("/quizzes/{id}/toggle-status", post(quiz::toggle_status))
                .route("/quizzes/{id}/stats", get(results::get_quiz_stats))
                .route("/quizzes/{id}/results", get(results::get_quiz_results))
                .route("/quizzes/{id}/export", get(results::export_all))
                .route(
                    "/quizzes/{id}/export/{class_name}",
                    get(results::export_class),
                )
                .route(
                    "/upload-image",
                    post(upload::upload_image).layer(DefaultBodyLimit::max(
                        state.config.max_upload_bytes + MULTIPART_OVERHEAD,
                    )),
                )
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    teacher_middleware,
                )),
        );

    let public_quiz_routes = Router::new()
        .route("/active", get(quiz::list_active_quizzes))
        .route("/{id}", get(quiz::get_public_quiz));

    let student_routes = Router::new()
        .route("/register", post(auth::register_student))
        // Protected student routes
        .merge(
            Router::new()
                .route("/quizzes", get(student::list_quizzes))
                .route("/quizzes/{id}", get(student::take_quiz))
                .route("/quizzes/{id}/submit", post(student::submit_quiz))
                .route("/quizzes/{id}/result", get(student::get_result))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    student_middleware,
                )),
        );

    Router::new()
        .nest("/api/teacher", teacher_routes)
        .nest("/api/quizzes", public_quiz_routes)
        .nest("/api/student", student_routes)
        .nest_service(UPLOAD_URL_PREFIX, ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{config::Config, store::MemoryStore, utils::jwt::{Role, sign_jwt}};

    fn test_state() -> AppState {
        let config = Config {
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_expiration: 3600,
            rust_log: "info".to_string(),
            port: 0,
            upload_dir: std::env::temp_dir().join("classroom-quiz-route-uploads"),
            export_dir: std::env::temp_dir().join("classroom-quiz-route-exports"),
            max_upload_bytes: crate::config::MAX_UPLOAD_BYTES,
            export_utc_offset_hours: 7,
            teacher_username: None,
            teacher_password: None,
            teacher_full_name: None,
        };
        AppState::new(Arc::new(MemoryStore::new()), config)
    }

    async fn status_of(req: Request<Body>) -> StatusCode {
        create_router(test_state()).oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let req = Request::get("/api/teacher/quizzes").body(Body::empty()).unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);

        let req = Request::get("/api/student/quizzes").body(Body::empty()).unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn student_token_cannot_reach_teacher_routes() {
        let token = sign_jwt(1, Role::Student, "An", Some("3B"), "test-secret", 60).unwrap();
        let req = Request::get("/api/teacher/quizzes")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_quiz_id_is_rejected() {
        let req = Request::get("/api/quizzes/not-an-id").body(Body::empty()).unwrap();
        assert_eq!(status_of(req).await, StatusCode::BAD_REQUEST);

        let token = sign_jwt(1, Role::Teacher, "Lan", None, "test-secret", 60).unwrap();
        let req = Request::get("/api/teacher/quizzes/zzz/stats")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(req).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let req = Request::get("/api/nope").body(Body::empty()).unwrap();
        assert_eq!(status_of(req).await, StatusCode::NOT_FOUND);
    }
}
