use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use tutorhub_database::{Course, Transaction};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub course_id: Uuid,
    #[validate(range(min = 1, max = 500))]
    pub classes_to_add: i32,
    /// Optional client-side total; must equal the server-computed amount.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub amount: Decimal,
    /// Amount in the currency's minor unit, as the checkout widget expects it.
    pub amount_minor: i64,
    pub currency: String,
    pub key_id: Option<String>,
    pub course_id: Uuid,
    pub classes_to_add: i32,
}

/// Callback payload posted by the checkout client after the gateway reports success.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyPaymentRequest {
    #[validate(length(min = 1))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1))]
    pub razorpay_signature: String,
    #[serde(rename = "courseId")]
    pub course_id: Uuid,
    #[serde(rename = "classesToAdd")]
    #[validate(range(min = 1, max = 500))]
    pub classes_to_add: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CancelPaymentRequest {
    #[validate(length(min = 1))]
    pub razorpay_order_id: String,
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub course: Course,
    pub transaction: Transaction,
    /// True when the order had already been settled with the same payment.
    pub already_settled: bool,
}
