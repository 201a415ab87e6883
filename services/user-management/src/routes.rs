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
        // OTP authentication
        .route("/auth/request-otp", post(handlers::request_otp))
        .route("/auth/verify-otp", post(handlers::verify_otp))
        .route("/auth/me", get(handlers::get_current_user))
        // Own profile
        .route("/profile", put(handlers::update_profile))
        // User catalog (admin only)
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/:user_id", get(handlers::get_user).put(handlers::update_user))
}
