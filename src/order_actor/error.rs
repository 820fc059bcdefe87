use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::{LineStatus, OrderStatus, PayStatus};

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Line item not found: {0}")]
    LineNotFound(u64),
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Cannot {action} an order in status {from}")]
    InvalidTransition { from: OrderStatus, action: &'static str },
    #[error("Cannot {action} line item {line_id} in status {from}")]
    InvalidLineTransition {
        line_id: u64,
        from: LineStatus,
        action: &'static str,
    },
    #[error("Cannot {action} payment {payment_uid} in status {from}")]
    InvalidPaymentTransition {
        payment_uid: String,
        from: PayStatus,
        action: &'static str,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
