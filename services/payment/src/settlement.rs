//! Payment settlement: order creation, callback verification and cancellation.
//! Crediting classes and closing the ledger entry happen in one unit of work,
//! and the ledger row guards against crediting the same order twice.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use tutorhub_auth::policy;
use tutorhub_common::{AppError, Caller, PaymentStatus};
use tutorhub_database::{Course, NewTransaction, Store, Transaction, UnitOfWork};

use crate::gateways::{GatewayOrder, PaymentGateway};
use crate::models::*;

/// Converts a major-unit amount (rupees) to the gateway's minor unit (paise).
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| AppError::Validation("Amount is out of range".to_string()))
}

fn order_amount(course: &Course, classes: i32) -> Decimal {
    course.price_per_class * Decimal::from(classes)
}

/// Number of classes a gateway order pays for at the course's current price.
fn classes_paid_for(course: &Course, order: &GatewayOrder) -> Result<i32, AppError> {
    let price_minor = to_minor_units(course.price_per_class)?;
    if price_minor <= 0 || order.amount <= 0 || order.amount % price_minor != 0 {
        return Err(AppError::Conflict(format!(
            "Order {} amount does not match the course price",
            order.id
        )));
    }
    i32::try_from(order.amount / price_minor)
        .map_err(|_| AppError::Conflict(format!("Order {} amount is out of range", order.id)))
}

#[tracing::instrument(skip(store, gateway, request), fields(student_id = %caller.user_id, course_id = %request.course_id))]
pub async fn create_order(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    currency: &str,
    caller: &Caller,
    request: CreateOrderRequest,
) -> Result<OrderResponse, AppError> {
    request.validate()?;

    let course = store
        .find_course(request.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    policy::can_pay_for_course(caller, &course)?;

    let amount = order_amount(&course, request.classes_to_add);
    if amount <= Decimal::ZERO {
        return Err(AppError::Domain("Course has no price set".to_string()));
    }
    if let Some(client_amount) = request.amount {
        if client_amount != amount {
            return Err(AppError::Validation(format!(
                "Amount {} does not match the course price of {}",
                client_amount, amount
            )));
        }
    }
    let amount_minor = to_minor_units(amount)?;

    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    let order = gateway.create_order(amount_minor, currency, &receipt).await?;

    // The ledger entry is best effort here; settlement recreates it if missing.
    let pending = NewTransaction {
        user_id: caller.user_id,
        course_id: course.course_id,
        order_id: order.id.clone(),
        amount,
        classes_purchased: request.classes_to_add,
        currency: order.currency.clone(),
        gateway: gateway.name().to_string(),
    };
    if let Err(e) = store.insert_transaction(pending).await {
        tracing::warn!("Failed to record pending transaction for order {}: {}", order.id, e);
    }

    Ok(OrderResponse {
        order_id: order.id,
        amount,
        amount_minor,
        currency: order.currency,
        key_id: gateway.key_id().map(str::to_string),
        course_id: course.course_id,
        classes_to_add: request.classes_to_add,
    })
}

#[tracing::instrument(
    skip(store, gateway, request),
    fields(student_id = %caller.user_id, order_id = %request.razorpay_order_id)
)]
pub async fn verify_payment(
    store: &dyn Store,
    gateway: &dyn PaymentGateway,
    currency: &str,
    caller: &Caller,
    request: VerifyPaymentRequest,
) -> Result<SettlementResponse, AppError> {
    request.validate()?;

    gateway.verify_payment_signature(
        &request.razorpay_order_id,
        &request.razorpay_payment_id,
        &request.razorpay_signature,
    )?;

    let mut unit = store.begin().await?;
    match settle(unit.as_mut(), gateway, currency, caller, &request).await {
        Ok(settlement) => {
            unit.commit().await?;
            if settlement.already_settled {
                tracing::info!("Order {} was already settled", request.razorpay_order_id);
            } else {
                tracing::info!(
                    "Order {} settled: {} classes added to course {}",
                    request.razorpay_order_id,
                    settlement.transaction.classes_purchased,
                    settlement.course.course_id
                );
            }
            Ok(settlement)
        }
        Err(e) => {
            if let Err(rollback_error) = unit.rollback().await {
                tracing::error!(
                    "Rollback failed for order {}: {}",
                    request.razorpay_order_id,
                    rollback_error
                );
            }
            Err(e)
        }
    }
}

async fn settle(
    unit: &mut dyn UnitOfWork,
    gateway: &dyn PaymentGateway,
    currency: &str,
    caller: &Caller,
    request: &VerifyPaymentRequest,
) -> Result<SettlementResponse, AppError> {
    let course = unit
        .course_for_update(request.course_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
    policy::can_pay_for_course(caller, &course)?;

    let order_id = request.razorpay_order_id.as_str();
    let payment_id = request.razorpay_payment_id.as_str();

    let classes = match unit.transaction_for_update(order_id).await? {
        Some(existing) => {
            if existing.course_id != course.course_id || existing.user_id != caller.user_id {
                return Err(AppError::Validation(
                    "Order does not belong to this course".to_string(),
                ));
            }
            match existing.status()? {
                PaymentStatus::Completed if existing.payment_id.as_deref() == Some(payment_id) => {
                    return Ok(SettlementResponse {
                        course,
                        transaction: existing,
                        already_settled: true,
                    });
                }
                PaymentStatus::Completed => {
                    return Err(AppError::Conflict(
                        "Order was already settled with a different payment".to_string(),
                    ));
                }
                PaymentStatus::Failed => {
                    return Err(AppError::Conflict("Order was cancelled".to_string()));
                }
                PaymentStatus::Pending => {
                    if existing.classes_purchased != request.classes_to_add {
                        return Err(AppError::Validation(
                            "classesToAdd does not match the order".to_string(),
                        ));
                    }
                    existing.classes_purchased
                }
            }
        }
        None => {
            tracing::warn!("No pending transaction for order {}; recording it now", order_id);
            // The signature does not cover the class count, so it is taken from the paid order.
            let order = gateway.fetch_order(order_id).await?;
            if order.currency != currency {
                return Err(AppError::Conflict(format!(
                    "Order {} was placed in {}, expected {}",
                    order_id, order.currency, currency
                )));
            }
            let classes = classes_paid_for(&course, &order)?;
            if classes != request.classes_to_add {
                return Err(AppError::Validation(
                    "classesToAdd does not match the order".to_string(),
                ));
            }

            unit.insert_transaction(NewTransaction {
                user_id: caller.user_id,
                course_id: course.course_id,
                order_id: order_id.to_string(),
                amount: Decimal::new(order.amount, 2),
                classes_purchased: classes,
                currency: order.currency,
                gateway: gateway.name().to_string(),
            })
            .await?;
            classes
        }
    };

    let course = unit.add_classes(course.course_id, classes).await?;
    let transaction = unit
        .settle_transaction(order_id, PaymentStatus::Completed, Some(payment_id))
        .await?;

    Ok(SettlementResponse {
        course,
        transaction,
        already_settled: false,
    })
}

#[tracing::instrument(skip(store, request), fields(user_id = %caller.user_id, order_id = %request.razorpay_order_id))]
pub async fn cancel_payment(
    store: &dyn Store,
    caller: &Caller,
    request: CancelPaymentRequest,
) -> Result<Transaction, AppError> {
    request.validate()?;

    let mut unit = store.begin().await?;
    match cancel(unit.as_mut(), caller, &request.razorpay_order_id).await {
        Ok(transaction) => {
            unit.commit().await?;
            tracing::info!("Order {} marked as failed", request.razorpay_order_id);
            Ok(transaction)
        }
        Err(e) => {
            if let Err(rollback_error) = unit.rollback().await {
                tracing::error!(
                    "Rollback failed for order {}: {}",
                    request.razorpay_order_id,
                    rollback_error
                );
            }
            Err(e)
        }
    }
}

async fn cancel(
    unit: &mut dyn UnitOfWork,
    caller: &Caller,
    order_id: &str,
) -> Result<Transaction, AppError> {
    let transaction = unit
        .transaction_for_update(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    if transaction.user_id != caller.user_id && !caller.is_admin() {
        return Err(AppError::Authorization(
            "You can only cancel your own payments".to_string(),
        ));
    }

    match transaction.status()? {
        PaymentStatus::Pending => {
            unit.settle_transaction(order_id, PaymentStatus::Failed, None)
                .await
        }
        PaymentStatus::Failed => Ok(transaction),
        PaymentStatus::Completed => Err(AppError::Conflict(
            "Payment has already been completed".to_string(),
        )),
    }
}
