use axum::{extract::State, http::StatusCode, response::Json};

use tutorhub_auth::Claims;
use tutorhub_common::{ApiResponse, AppError};
use tutorhub_database::Transaction;
use tutorhub_notifications::Notification;

use crate::models::*;
use crate::services::{AppState, TransactionService};
use crate::settlement;

pub async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::success("Payment Service is healthy".to_string()))
}

pub async fn create_order(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), AppError> {
    let order = settlement::create_order(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.config.razorpay.currency,
        &claims.caller(),
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<SettlementResponse>>, AppError> {
    let settlement = settlement::verify_payment(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.config.razorpay.currency,
        &claims.caller(),
        request,
    )
    .await?;

    if settlement.already_settled {
        return Ok(Json(ApiResponse::success_with_message(
            settlement,
            "Payment was already verified",
        )));
    }

    state.notifier.dispatch(
        claims.email.clone(),
        Notification::PaymentSucceeded {
            name: claims.full_name.clone(),
            course_title: settlement.course.title.clone(),
            amount: settlement.transaction.amount.to_string(),
            currency: settlement.transaction.currency.clone(),
            classes: settlement.transaction.classes_purchased,
            remaining: settlement.course.no_of_classes,
            payment_id: settlement.transaction.payment_id.clone().unwrap_or_default(),
        },
    );

    Ok(Json(ApiResponse::success_with_message(
        settlement,
        "Payment verified successfully",
    )))
}

pub async fn cancel_payment(
    State(state): State<AppState>,
    claims: Claims,
    Json(request): Json<CancelPaymentRequest>,
) -> Result<Json<ApiResponse<Transaction>>, AppError> {
    let transaction =
        settlement::cancel_payment(state.store.as_ref(), &claims.caller(), request).await?;

    Ok(Json(ApiResponse::success_with_message(
        transaction,
        "Payment cancelled",
    )))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<ApiResponse<Vec<Transaction>>>, AppError> {
    let transactions = TransactionService::new(&state)
        .list(&claims.caller())
        .await?;
    Ok(Json(ApiResponse::success(transactions)))
}
