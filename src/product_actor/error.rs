use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::ProductStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Option {option_id} not found on product {product_id}")]
    OptionNotFound { product_id: String, option_id: u64 },
    #[error("Product {product_id} is {status} and cannot be ordered")]
    Unavailable { product_id: String, status: ProductStatus },
    #[error("Product validation error: {0}")]
    ValidationError(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for ProductError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => ProductError::NotFound(id),
            other => ProductError::ActorCommunicationError(other.to_string()),
        }
    }
}
