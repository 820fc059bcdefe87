//! Payment gateway port and its PortOne adapter.

pub mod error;
#[cfg(test)]
pub mod mock;
pub mod portone;

pub use error::*;
pub use portone::PortOneClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::PayStatus;

/// What the gateway reports about one payment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub status: PayStatus,
    pub amount_total: u64,
    /// The full response body, kept as the payment's `meta`.
    pub raw: Value,
}

impl GatewayPayment {
    /// Reads `status` and `amount.total` out of a payment lookup body.
    pub fn from_json(raw: Value) -> Result<Self, GatewayError> {
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::MalformedResponse("missing status".to_string()))?
            .parse::<PayStatus>()
            .map_err(GatewayError::MalformedResponse)?;
        let amount_total = raw
            .pointer("/amount/total")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::MalformedResponse("missing amount.total".to_string()))?;
        Ok(Self {
            status,
            amount_total,
            raw,
        })
    }
}

/// Remote payment processor, addressed by the merchant-side payment id.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn get_payment(&self, payment_uid: &str) -> Result<GatewayPayment, GatewayError>;

    /// Cancels the full payment. `Ok` means the gateway answered 200.
    async fn cancel_payment(&self, payment_uid: &str, reason: &str) -> Result<(), GatewayError>;
}
