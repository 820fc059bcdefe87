use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{GatewayError, GatewayPayment, PaymentGateway};

/// PortOne REST client.
pub struct PortOneClient {
    client: Client,
    base_url: String,
    secret: String,
}

impl PortOneClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
        })
    }

    fn payment_url(&self, payment_uid: &str) -> String {
        format!("{}/payments/{}", self.base_url, payment_uid)
    }

    fn authorization(&self) -> String {
        format!("PortOne {}", self.secret)
    }
}

#[async_trait]
impl PaymentGateway for PortOneClient {
    #[instrument(skip(self))]
    async fn get_payment(&self, payment_uid: &str) -> Result<GatewayPayment, GatewayError> {
        let response = self
            .client
            .get(self.payment_url(payment_uid))
            .header("Authorization", self.authorization())
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            warn!(status = status.as_u16(), "Payment lookup failed");
            return Err(GatewayError::from_response(status.as_u16(), &body));
        }
        let body: Value = response.json().await?;
        debug!("Payment lookup succeeded");
        GatewayPayment::from_json(body)
    }

    #[instrument(skip(self))]
    async fn cancel_payment(&self, payment_uid: &str, reason: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(format!("{}/cancel", self.payment_url(payment_uid)))
            .header("Authorization", self.authorization())
            .json(&json!({ "reason": reason }))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK {
            debug!("Payment cancelled at gateway");
            return Ok(());
        }
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        warn!(status = status.as_u16(), "Payment cancellation refused");
        Err(GatewayError::from_response(status.as_u16(), &body))
    }
}
