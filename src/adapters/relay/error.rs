//! Relay Error Types

use thiserror::Error;

/// Errors raised while handing a transaction to a relay
#[derive(Error, Debug, Clone)]
pub enum RelayError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// JSON-RPC error returned by the relay
    #[error("Relay error: {message} (code: {code})")]
    ApiError { code: i64, message: String },

    /// Non-success HTTP status
    #[error("Relay rejected transaction with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Credential or endpoint required by the selected mode is absent
    #[error("Missing relay credential: {0}")]
    MissingCredential(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Request timed out")]
    Timeout,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid fee account: {0}")]
    InvalidFeeAccount(String),
}

impl RelayError {
    /// Transient failures worth another submission
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::HttpError(_)
                | RelayError::Timeout
                | RelayError::NetworkError(_)
                | RelayError::RateLimited
        )
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::Timeout
        } else if err.is_connect() {
            RelayError::NetworkError(err.to_string())
        } else {
            RelayError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(RelayError::Timeout.is_retryable());
        assert!(RelayError::RateLimited.is_retryable());
        assert!(RelayError::NetworkError("reset".into()).is_retryable());

        assert!(!RelayError::MissingCredential("apikey".into()).is_retryable());
        assert!(!RelayError::Rejected {
            status: 400,
            body: "bad".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::ApiError {
            code: -32002,
            message: "Transaction simulation failed".to_string(),
        };
        assert!(err.to_string().contains("-32002"));
        assert!(err.to_string().contains("simulation failed"));
    }
}
