use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::{GatewayError, GatewayPayment, PaymentGateway};
use crate::domain::PayStatus;

/// In-memory gateway for tests. Lookups answer from `payments`; cancels pop
/// scripted replies and default to success.
#[derive(Default)]
pub struct MockGateway {
    payments: Mutex<HashMap<String, GatewayPayment>>,
    cancel_replies: Mutex<VecDeque<Result<(), GatewayError>>>,
    cancel_calls: Mutex<Vec<(String, String)>>,
    lookup_failure: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_payment(&self, payment_uid: &str, status: PayStatus, amount_total: u64) {
        let raw = json!({
            "id": payment_uid,
            "status": status.as_str(),
            "amount": { "total": amount_total },
        });
        self.payments.lock().unwrap().insert(
            payment_uid.to_string(),
            GatewayPayment {
                status,
                amount_total,
                raw,
            },
        );
    }

    /// Every lookup fails with `err` from now on.
    pub fn fail_lookups(&self, err: GatewayError) {
        *self.lookup_failure.lock().unwrap() = Some(err);
    }

    pub fn push_cancel_reply(&self, reply: Result<(), GatewayError>) {
        self.cancel_replies.lock().unwrap().push_back(reply);
    }

    pub fn cancel_calls(&self) -> Vec<(String, String)> {
        self.cancel_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn get_payment(&self, payment_uid: &str) -> Result<GatewayPayment, GatewayError> {
        if let Some(err) = self.lookup_failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.payments
            .lock()
            .unwrap()
            .get(payment_uid)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(payment_uid.to_string()))
    }

    async fn cancel_payment(&self, payment_uid: &str, reason: &str) -> Result<(), GatewayError> {
        self.cancel_calls
            .lock()
            .unwrap()
            .push((payment_uid.to_string(), reason.to_string()));
        self.cancel_replies.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}
