use thiserror::Error;

use crate::gateway::GatewayError;
use crate::order_actor::OrderError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    #[error("Payment not found: {0}")]
    NotFound(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Order(OrderError),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<OrderError> for PaymentError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => PaymentError::OrderNotFound(id),
            OrderError::PaymentNotFound(uid) => PaymentError::NotFound(uid),
            OrderError::ActorCommunicationError(msg) => PaymentError::ActorCommunicationError(msg),
            other => PaymentError::Order(other),
        }
    }
}
