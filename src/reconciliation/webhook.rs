use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::IpAddr;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{PaymentError, PaymentReconciler};

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    #[serde(rename = "paymentId")]
    payment_id: Option<String>,
}

/// Successful webhook reply body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub is_paid: bool,
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WebhookError {
    #[error("Forbidden source address: {0}")]
    Forbidden(IpAddr),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebhookError {
    pub fn http_status(&self) -> u16 {
        match self {
            WebhookError::Forbidden(_) => 403,
            WebhookError::BadRequest(_) => 400,
            WebhookError::NotFound(_) => 404,
            WebhookError::Internal(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotFound(_) | PaymentError::OrderNotFound(_) | PaymentError::Gateway(_) => {
                WebhookError::NotFound(err.to_string())
            }
            other => WebhookError::Internal(other.to_string()),
        }
    }
}

/// Inbound gateway notifications. Each call re-verifies the payment, so
/// duplicate deliveries are harmless.
#[derive(Clone)]
pub struct WebhookHandler {
    allowed_ips: Vec<IpAddr>,
    reconciler: PaymentReconciler,
}

impl WebhookHandler {
    pub fn new(allowed_ips: Vec<IpAddr>, reconciler: PaymentReconciler) -> Self {
        Self {
            allowed_ips,
            reconciler,
        }
    }

    #[instrument(skip(self, body))]
    pub async fn handle(&self, remote_ip: IpAddr, body: &str) -> Result<WebhookResponse, WebhookError> {
        if !self.allowed_ips.contains(&remote_ip) {
            warn!("Webhook from address outside the allow-list");
            return Err(WebhookError::Forbidden(remote_ip));
        }

        let payload: WebhookPayload =
            serde_json::from_str(body).map_err(|e| WebhookError::BadRequest(format!("Invalid JSON: {}", e)))?;
        let payment_id = payload
            .data
            .and_then(|data| data.payment_id)
            .ok_or_else(|| WebhookError::BadRequest("Missing data.paymentId".to_string()))?;
        let payment_uid = Uuid::parse_str(&payment_id)
            .map_err(|_| WebhookError::BadRequest(format!("Invalid paymentId: {}", payment_id)))?;

        let verification = self.reconciler.verify_payment(payment_uid).await?;
        let message = if verification.paid_ok {
            "Payment confirmed".to_string()
        } else {
            format!("Payment status is {}", verification.status)
        };
        info!(payment_uid = %payment_uid, is_paid = verification.paid_ok, "Webhook processed");
        Ok(WebhookResponse {
            status: "ok".to_string(),
            is_paid: verification.paid_ok,
            message,
        })
    }
}
