use thiserror::Error;

/// Errors from the management plane or the offline store
#[derive(Debug, Error)]
pub enum ArmError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("authorization failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("request failed with status {status} [{code}]: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("long-running operation ended as {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("long-running operation still running after {0} polls")]
    Timeout(u32),

    #[error("failed to reach Azure Resource Manager: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("local store: {0}")]
    Store(String),
}

impl ArmError {
    pub fn code(&self) -> &'static str {
        match self {
            ArmError::NotFound(_) => "NOT_FOUND",
            ArmError::Auth { .. } => "AUTH_FAILED",
            ArmError::Status { .. } => "ARM_API_ERROR",
            ArmError::OperationFailed { .. } => "OPERATION_FAILED",
            ArmError::Timeout(_) => "TIMEOUT",
            ArmError::Transport(_) => "CONNECT_FAILED",
            ArmError::Decode(_) => "DECODE_FAILED",
            ArmError::Store(_) => "STORE_FAILED",
        }
    }
}
