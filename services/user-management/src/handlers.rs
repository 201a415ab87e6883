use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use tutorhub_auth::{policy, Claims};
use tutorhub_common::{ApiResponse, AppError};
use tutorhub_database::User;

use crate::models::*;
use crate::services::{AppState, UserService};

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("User Management Service is healthy".to_string()))
}

pub async fn request_otp(
    State(state): State<AppState>,
    Json(request): Json<RequestOtpRequest>,
) -> Result<Json<ApiResponse<OtpRequestedResponse>>, AppError> {
    request.validate()?;

    let response = UserService::new(&state).request_otp(request).await?;
    Ok(Json(ApiResponse::success_with_message(
        response,
        "OTP sent to your email",
    )))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>, AppError> {
    request.validate()?;

    let response = UserService::new(&state).verify_otp(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

pub async fn get_current_user(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = UserService::new(&state).get_user(claims.sub).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    request.validate()?;

    let user = UserService::new(&state)
        .update_profile(claims.sub, request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(user, "Profile updated")))
}

pub async fn list_users(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    policy::can_manage_users(&claims.caller())?;

    let users = UserService::new(&state).list_users(query.role).await?;
    Ok(Json(ApiResponse::success(users)))
}

pub async fn create_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), AppError> {
    policy::can_manage_users(&claims.caller())?;
    request.validate()?;

    let user = UserService::new(&state).create_user(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn get_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    policy::can_view_user(&claims.caller(), user_id)?;

    let user = UserService::new(&state).get_user(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    policy::can_manage_users(&claims.caller())?;
    request.validate()?;

    let user = UserService::new(&state).update_user(user_id, request).await?;
    Ok(Json(ApiResponse::success(user)))
}
