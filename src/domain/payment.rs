use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Order;
use crate::gateway::GatewayPayment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayMethod {
    Card,
    VirtualAccount,
}

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayStatus {
    Ready,
    Paid,
    Cancelled,
    Failed,
    VirtualAccountIssued,
    PartialCancelled,
    PayPending,
}

impl PayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayStatus::Ready => "READY",
            PayStatus::Paid => "PAID",
            PayStatus::Cancelled => "CANCELLED",
            PayStatus::Failed => "FAILED",
            PayStatus::VirtualAccountIssued => "VIRTUAL_ACCOUNT_ISSUED",
            PayStatus::PartialCancelled => "PARTIAL_CANCELLED",
            PayStatus::PayPending => "PAY_PENDING",
        }
    }
}

impl fmt::Display for PayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(PayStatus::Ready),
            "PAID" => Ok(PayStatus::Paid),
            "CANCELLED" => Ok(PayStatus::Cancelled),
            "FAILED" => Ok(PayStatus::Failed),
            "VIRTUAL_ACCOUNT_ISSUED" => Ok(PayStatus::VirtualAccountIssued),
            "PARTIAL_CANCELLED" => Ok(PayStatus::PartialCancelled),
            "PAY_PENDING" => Ok(PayStatus::PayPending),
            other => Err(format!("unknown payment status {:?}", other)),
        }
    }
}

/// One payment attempt for an order, tracked against the gateway by `uid`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPayment {
    pub uid: Uuid,
    pub name: String,
    pub desired_amount: u64,
    pub buyer_name: String,
    pub buyer_email: String,
    pub pay_method: PayMethod,
    pay_status: PayStatus,
    is_paid_ok: bool,
    meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OrderPayment {
    pub fn new(
        name: impl Into<String>,
        desired_amount: u64,
        buyer_name: impl Into<String>,
        buyer_email: impl Into<String>,
    ) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name: name.into(),
            desired_amount,
            buyer_name: buyer_name.into(),
            buyer_email: buyer_email.into(),
            pay_method: PayMethod::Card,
            pay_status: PayStatus::Ready,
            is_paid_ok: false,
            meta: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// The id the gateway knows this payment by.
    pub fn merchant_uid(&self) -> String {
        self.uid.to_string()
    }

    pub fn pay_status(&self) -> PayStatus {
        self.pay_status
    }

    pub fn is_paid_ok(&self) -> bool {
        self.is_paid_ok
    }

    /// Last raw gateway response.
    pub fn meta(&self) -> &serde_json::Value {
        &self.meta
    }

    /// Stores a gateway report and returns whether the payment is paid-ok:
    /// PAID and exactly the requested amount.
    pub(crate) fn record_gateway_report(&mut self, report: &GatewayPayment) -> bool {
        self.meta = report.raw.clone();
        self.pay_status = report.status;
        self.is_paid_ok = report.status == PayStatus::Paid && report.amount_total == self.desired_amount;
        self.is_paid_ok
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.pay_status = PayStatus::Cancelled;
    }
}

/// Runs inside the order actor after the gateway confirmed a cancellation,
/// bringing the owning order in line with the cancelled payment.
#[derive(Clone, Copy)]
pub struct RelatedStatusUpdate(pub fn(&mut Order));

impl RelatedStatusUpdate {
    pub fn apply(&self, order: &mut Order) {
        (self.0)(order)
    }
}

impl Default for RelatedStatusUpdate {
    fn default() -> Self {
        Self(cancel_parent_order)
    }
}

impl fmt::Debug for RelatedStatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RelatedStatusUpdate")
    }
}

/// Default strategy: a cancelled payment cancels its order.
pub fn cancel_parent_order(order: &mut Order) {
    order.mark_cancelled_by_payment();
}
