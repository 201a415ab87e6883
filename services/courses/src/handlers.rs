use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use tutorhub_auth::{policy, Claims};
use tutorhub_common::{ApiResponse, AppError};
use tutorhub_database::{CompletedClass, Course, CourseMessage, DemoClass};

use crate::completion;
use crate::models::*;
use crate::services::{AppState, CourseService, DemoClassService, MessageService};

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Courses Service is healthy".to_string()))
}

pub async fn create_course(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Course>>), AppError> {
    policy::can_edit_course(&claims.caller())?;
    request.validate()?;

    let course = CourseService::new(&state).create_course(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(course))))
}

pub async fn update_course(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
    Json(request): Json<UpdateCourseRequest>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    policy::can_edit_course(&claims.caller())?;
    request.validate()?;

    let course = CourseService::new(&state)
        .update_course(course_id, request)
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

pub async fn list_courses(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<Course>>>, AppError> {
    let courses = CourseService::new(&state)
        .list_courses(&claims.caller())
        .await?;
    Ok(Json(ApiResponse::success(courses)))
}

pub async fn get_course(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Course>>, AppError> {
    let course = CourseService::new(&state)
        .get_course(&claims.caller(), course_id)
        .await?;
    Ok(Json(ApiResponse::success(course)))
}

pub async fn complete_class(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
    Json(request): Json<CompleteClassRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CompletedClass>>), AppError> {
    let completed = completion::complete_class(
        state.store.as_ref(),
        &claims.caller(),
        course_id,
        request,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            completed,
            "Class marked as completed",
        )),
    ))
}

pub async fn list_completed_classes(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CompletedClass>>>, AppError> {
    let classes = CourseService::new(&state)
        .list_completed_classes(&claims.caller(), course_id)
        .await?;
    Ok(Json(ApiResponse::success(classes)))
}

pub async fn teacher_earnings(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<EarningsResponse>>, AppError> {
    let earnings = CourseService::new(&state)
        .teacher_earnings(&claims.caller())
        .await?;
    Ok(Json(ApiResponse::success(earnings)))
}

pub async fn book_demo_class(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateDemoClassRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DemoClass>>), AppError> {
    request.validate()?;

    let demo_class = DemoClassService::new(&state)
        .book(&claims.caller(), request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(demo_class))))
}

pub async fn list_demo_classes(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<DemoClass>>>, AppError> {
    let demo_classes = DemoClassService::new(&state)
        .list(&claims.caller())
        .await?;
    Ok(Json(ApiResponse::success(demo_classes)))
}

pub async fn update_demo_class_status(
    State(state): State<AppState>,
    claims: Claims,
    Path(demo_class_id): Path<Uuid>,
    Json(request): Json<UpdateDemoClassStatusRequest>,
) -> Result<Json<ApiResponse<DemoClass>>, AppError> {
    request.validate()?;

    let demo_class = DemoClassService::new(&state)
        .update_status(&claims.caller(), demo_class_id, request)
        .await?;
    Ok(Json(ApiResponse::success(demo_class)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CourseMessage>>>, AppError> {
    let messages = MessageService::new(&state)
        .list(&claims.caller(), course_id)
        .await?;
    Ok(Json(ApiResponse::success(messages)))
}

pub async fn post_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(course_id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourseMessage>>), AppError> {
    request.validate()?;

    let message = MessageService::new(&state)
        .post(&claims.caller(), course_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(message))))
}
