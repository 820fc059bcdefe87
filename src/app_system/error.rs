use thiserror::Error;

use crate::gateway::GatewayError;

/// Failures starting or stopping the system.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Task failed: {0}")]
    TaskFailed(String),
}
