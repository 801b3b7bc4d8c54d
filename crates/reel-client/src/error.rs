//! Client error types.
//!
//! The taxonomy separates "what failed" from "how to recover": rate limits
//! carry a structured server-suggested wait, transient unavailability is
//! retried with generic backoff, and everything else propagates immediately.

use std::time::Duration;

use thiserror::Error;

use crate::backoff::parse_retry_hint;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The service asked us to slow down; may carry a suggested wait.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Transient service-side failure worth retrying.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Permanent rejection (auth failure, malformed request); never retried.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The remote asset reached its failed terminal state.
    #[error("Remote processing failed: {0}")]
    ProcessingFailed(String),

    /// External cancellation observed; teardown was still attempted.
    #[error("Operation cancelled")]
    Cancelled,

    /// Model output could not be recovered into a structure.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Rate-limit error, extracting any server-suggested wait from the
    /// message text.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        let message = message.into();
        let retry_after = parse_retry_hint(&message);
        Self::RateLimited {
            message,
            retry_after,
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map an HTTP error status plus body to the taxonomy.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::rate_limited(body)
        } else if status.is_server_error() {
            Self::Unavailable(format!("{}: {}", status, body))
        } else {
            Self::Rejected(format!("{}: {}", status, body))
        }
    }

    /// Whether the retrying invoker should re-issue the operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::RateLimited { .. }
                | ClientError::Unavailable(_)
                | ClientError::Network(_)
        )
    }

    /// Server-suggested wait, when one was provided.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
