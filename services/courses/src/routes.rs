use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::services::AppState;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Course catalog
        .route("/courses", get(handlers::list_courses).post(handlers::create_course))
        .route("/courses/:course_id", get(handlers::get_course).put(handlers::update_course))
        // Class completion
        .route("/courses/:course_id/complete", post(handlers::complete_class))
        .route(
            "/courses/:course_id/completed-classes",
            get(handlers::list_completed_classes),
        )
        .route("/teacher/earnings", get(handlers::teacher_earnings))
        // Course messages
        .route(
            "/courses/:course_id/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        // Demo classes
        .route(
            "/demo-classes",
            get(handlers::list_demo_classes).post(handlers::book_demo_class),
        )
        .route(
            "/demo-classes/:demo_class_id/status",
            put(handlers::update_demo_class_status),
        )
}
