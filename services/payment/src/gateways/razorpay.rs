use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use tutorhub_common::{AppError, RazorpayConfig};

use super::{GatewayOrder, PaymentGateway};
use crate::signature::verify_signature;

#[derive(Debug, Deserialize)]
struct RazorpayErrorBody {
    error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct RazorpayErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

async fn read_order(response: reqwest::Response, action: &str) -> Result<GatewayOrder, AppError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Invalid Razorpay order response: {}", e))
        });
    }

    let detail = response
        .json::<RazorpayErrorBody>()
        .await
        .ok()
        .map(|body| {
            format!(
                "{}: {}",
                body.error.code.unwrap_or_else(|| "ERROR".to_string()),
                body.error.description.unwrap_or_default()
            )
        })
        .unwrap_or_else(|| status.to_string());

    tracing::warn!("Razorpay rejected {} ({}): {}", action, status, detail);
    Err(AppError::ExternalService(format!(
        "Razorpay {} failed: {}",
        action, detail
    )))
}

#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config: config.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), AppError> {
        match (self.config.key_id.as_deref(), self.config.key_secret.as_deref()) {
            (Some(key_id), Some(key_secret)) => Ok((key_id, key_secret)),
            _ => Err(AppError::Configuration(
                "Razorpay credentials are not configured".to_string(),
            )),
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    fn key_id(&self) -> Option<&str> {
        self.config.key_id.as_deref()
    }

    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, AppError> {
        let (key_id, key_secret) = self.credentials()?;

        let response = self
            .client
            .post(format!("{}/v1/orders", self.config.base_url.trim_end_matches('/')))
            .basic_auth(key_id, Some(key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": currency,
                "receipt": receipt,
            }))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Razorpay request failed: {}", e)))?;

        let order = read_order(response, "order creation").await?;
        tracing::info!("Razorpay order {} created for {} {}", order.id, amount_minor, currency);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<GatewayOrder, AppError> {
        let (key_id, key_secret) = self.credentials()?;

        let response = self
            .client
            .get(format!(
                "{}/v1/orders/{}",
                self.config.base_url.trim_end_matches('/'),
                order_id
            ))
            .basic_auth(key_id, Some(key_secret))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Razorpay request failed: {}", e)))?;

        read_order(response, "order lookup").await
    }

    fn verify_payment_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), AppError> {
        let (_, key_secret) = self.credentials()?;

        if verify_signature(key_secret, order_id, payment_id, signature) {
            Ok(())
        } else {
            Err(AppError::Payment("Invalid payment signature".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::expected_signature;
    use mockito::Matcher;

    fn config(base_url: &str) -> RazorpayConfig {
        RazorpayConfig {
            key_id: Some("rzp_test_key".to_string()),
            key_secret: Some("rzp_test_secret".to_string()),
            base_url: base_url.to_string(),
            currency: "INR".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_order_posts_minor_units_with_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/orders")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .match_body(Matcher::PartialJson(json!({
                "amount": 250000,
                "currency": "INR",
                "receipt": "rcpt_1",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"order_1","entity":"order","amount":250000,"currency":"INR","receipt":"rcpt_1","status":"created"}"#,
            )
            .create_async()
            .await;

        let gateway = RazorpayGateway::new(&config(&server.url()));
        let order = gateway.create_order(250000, "INR", "rcpt_1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(order.id, "order_1");
        assert_eq!(order.amount, 250000);
        assert_eq!(order.status.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn test_gateway_rejection_is_external_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/orders")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"amount too small"}}"#)
            .create_async()
            .await;

        let gateway = RazorpayGateway::new(&config(&server.url()));
        let err = gateway.create_order(1, "INR", "rcpt_1").await.unwrap_err();

        assert!(matches!(err, AppError::ExternalService(msg) if msg.contains("amount too small")));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_calling_gateway() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/orders")
            .expect(0)
            .create_async()
            .await;

        let gateway = RazorpayGateway::new(&RazorpayConfig {
            key_secret: None,
            ..config(&server.url())
        });
        let err = gateway.create_order(1000, "INR", "rcpt_1").await.unwrap_err();

        assert!(matches!(err, AppError::Configuration(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_order_reads_paid_amount() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/orders/order_9")
            .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"order_9","entity":"order","amount":50000,"amount_paid":50000,"currency":"INR","receipt":"rcpt_9","status":"paid"}"#,
            )
            .create_async()
            .await;

        let gateway = RazorpayGateway::new(&config(&server.url()));
        let order = gateway.fetch_order("order_9").await.unwrap();

        mock.assert_async().await;
        assert_eq!(order.amount, 50000);
        assert_eq!(order.status.as_deref(), Some("paid"));
    }

    #[tokio::test]
    async fn test_fetch_unknown_order_is_external_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/orders/order_missing")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":"BAD_REQUEST_ERROR","description":"The id provided does not exist"}}"#)
            .create_async()
            .await;

        let gateway = RazorpayGateway::new(&config(&server.url()));
        let err = gateway.fetch_order("order_missing").await.unwrap_err();

        assert!(matches!(err, AppError::ExternalService(msg) if msg.contains("does not exist")));
    }

    #[test]
    fn test_signature_verification() {
        let gateway = RazorpayGateway::new(&config("http://localhost"));
        let signature = expected_signature("rzp_test_secret", "order_1", "pay_1").unwrap();

        gateway
            .verify_payment_signature("order_1", "pay_1", &signature)
            .unwrap();
        let err = gateway
            .verify_payment_signature("order_1", "pay_2", &signature)
            .unwrap_err();
        assert!(matches!(err, AppError::Payment(msg) if msg == "Invalid payment signature"));
    }
}
