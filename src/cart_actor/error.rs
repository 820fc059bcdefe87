use thiserror::Error;

use crate::actor_framework::FrameworkError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart not found: {0}")]
    NotFound(String),
    #[error("Cart already exists: {0}")]
    AlreadyExists(String),
    #[error("Cart item not found: {0}")]
    ItemNotFound(u64),
    #[error("Cart validation error: {0}")]
    ValidationError(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for CartError {
    fn from(err: FrameworkError) -> Self {
        match err {
            FrameworkError::NotFound(id) => CartError::NotFound(id),
            FrameworkError::AlreadyExists(id) => CartError::AlreadyExists(id),
            other => CartError::ActorCommunicationError(other.to_string()),
        }
    }
}
