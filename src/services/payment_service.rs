use async_trait::async_trait;
use chrono::Local;
use reqwest::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::RazorpayConfig,
    error::{AppError, Result},
};

/// A payment as reported by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub order_id: Option<String>,
    pub raw: serde_json::Value,
}

impl GatewayPayment {
    pub fn from_raw(raw: serde_json::Value) -> Result<Self> {
        let text = |key: &str| raw.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let id = text("id")
            .ok_or_else(|| AppError::GatewayError("Payment response missing id".to_string()))?;
        let amount = raw
            .get("amount")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| AppError::GatewayError("Payment response missing amount".to_string()))?;

        Ok(Self {
            id,
            amount,
            currency: text("currency").unwrap_or_default(),
            status: text("status").unwrap_or_default(),
            order_id: text("order_id").filter(|v| !v.is_empty()),
            raw,
        })
    }

    /// Captured or authorized payments are the only ones that can pay for an order.
    pub fn is_settled(&self) -> bool {
        matches!(self.status.as_str(), "captured" | "authorized")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub payment_capture: u8,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<serde_json::Value>;

    /// Unknown ids yield `PaymentNotFound`, anything else `GatewayError`.
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;

    async fn refund_payment(&self, payment_id: &str, amount: i64) -> Result<()>;
}

/// Receipt reference sent with every gateway order, e.g.
/// `ORD-20250101120000-1A2B3C4D`.
pub fn generate_receipt_id() -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let random_part = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{}", timestamp, random_part)
}

pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
        response
            .json()
            .await
            .map_err(|e| AppError::GatewayError(format!("Failed to parse Razorpay response: {}", e)))
    }
}

fn error_description(body: &serde_json::Value) -> String {
    body.pointer("/error/description")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Razorpay error")
        .to_string()
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::GatewayError(format!("Razorpay request failed: {}", e)))?;

        let status = response.status();
        let body = Self::read_json(response).await?;

        if !status.is_success() {
            tracing::error!("Razorpay order creation failed: {}", body);
            return Err(AppError::GatewayError(format!(
                "Order creation failed: {}",
                error_description(&body)
            )));
        }

        Ok(body)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let response = self
            .http
            .get(format!("{}/payments/{}", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await
            .map_err(|e| AppError::GatewayError(format!("Razorpay request failed: {}", e)))?;

        let status = response.status();
        let body = Self::read_json(response).await?;

        match status {
            s if s.is_success() => GatewayPayment::from_raw(body),
            // Razorpay answers unknown ids with 400 BAD_REQUEST_ERROR
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                tracing::warn!("Payment {} not found: {}", payment_id, error_description(&body));
                Err(AppError::PaymentNotFound(payment_id.to_string()))
            }
            _ => {
                tracing::error!("Razorpay payment fetch failed ({}): {}", status, body);
                Err(AppError::GatewayError(error_description(&body)))
            }
        }
    }

    async fn refund_payment(&self, payment_id: &str, amount: i64) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/payments/{}/refund", self.base_url, payment_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&serde_json::json!({ "amount": amount }))
            .send()
            .await
            .map_err(|e| AppError::GatewayError(format!("Razorpay request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = Self::read_json(response).await?;
            return Err(AppError::GatewayError(format!(
                "Refund of {} failed: {}",
                payment_id,
                error_description(&body)
            )));
        }

        Ok(())
    }
}
