pub mod admin;
pub mod export;
pub mod health;
pub mod student;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    auth::{require_admin, require_student},
    cors::cors_layer,
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::AppState;

const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Full application router. Rate limiting sits inside auth so that it is
/// keyed by the authenticated user.
pub fn app(state: AppState, config: &Config) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let admin_api = Router::new()
        .route(
            "/api/admin/assessments",
            get(admin::list_assessments).post(admin::create_assessment),
        )
        .route(
            "/api/admin/assessments/:id",
            get(admin::get_assessment)
                .patch(admin::update_assessment)
                .delete(admin::delete_assessment),
        )
        .route("/api/admin/assessments/:id/attempts", get(admin::list_attempts))
        .route("/api/admin/assessments/:id/analytics", get(admin::analytics))
        .route("/api/admin/assessments/:id/export", get(export::export_results))
        .route("/api/admin/attempts/:id", get(admin::get_attempt))
        .route("/api/admin/submissions/:id", get(admin::get_submission))
        .layer(from_fn_with_state(new_rps_state(config.admin_rps), rps_middleware))
        .layer(from_fn(require_admin));

    let student_api = Router::new()
        .route("/api/student/assessments", get(student::list_assessments))
        .route("/api/student/assessments/:id", get(student::get_assessment))
        .route("/api/student/assessments/:id/start", post(student::start_attempt))
        .route("/api/student/attempts", get(student::list_attempts))
        .route("/api/student/attempts/:id/answers", post(student::save_answer))
        .route("/api/student/attempts/:id/submit-quiz", post(student::submit_quiz))
        .route("/api/student/attempts/:id/submit-coding", post(student::submit_coding))
        .route("/api/student/attempts/:id/tab-switch", post(student::tab_switch))
        .route("/api/student/attempts/:id/fullscreen-exit", post(student::fullscreen_exit))
        .route("/api/student/attempts/:id/results", get(student::results))
        .route("/api/student/attempts/:id/submissions", get(student::list_submissions))
        .route(
            "/api/student/attempts/:id/problems/:problem_id/run",
            post(student::run_code),
        )
        .route(
            "/api/student/attempts/:id/problems/:problem_id/submissions",
            get(student::problem_submissions).post(student::submit_code),
        )
        .route("/api/student/submissions/:id", get(student::get_submission))
        .layer(from_fn_with_state(new_rps_state(config.student_rps), rps_middleware))
        .layer(from_fn(require_student));

    base_routes
        .merge(admin_api)
        .merge(student_api)
        .with_state(state)
        .layer(cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
}
