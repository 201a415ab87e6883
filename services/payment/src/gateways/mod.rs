pub mod razorpay;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tutorhub_common::AppError;

pub use self::razorpay::RazorpayGateway;

/// An order as acknowledged by the gateway. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Public key handed to the checkout client.
    fn key_id(&self) -> Option<&str>;

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError>;

    /// Looks up an order the gateway already knows, including the amount it was created for.
    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, AppError>;

    /// Fails with a payment error when the callback signature is not authentic.
    fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), AppError>;
}
