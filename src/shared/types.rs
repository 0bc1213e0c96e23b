use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human readable description of what went wrong
    pub error: String,
    /// Attempts left in the current window (only set on quota errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            remaining: None,
        }
    }

    pub fn with_remaining(error: impl Into<String>, remaining: u32) -> Self {
        Self {
            error: error.into(),
            remaining: Some(remaining),
        }
    }
}
