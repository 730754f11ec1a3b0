use reqwest::StatusCode;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum InitError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Secret '{name}' could not be read: {message}")]
    Secret { name: String, message: String },

    #[error("Failed to connect to database: {0}")]
    Connection(#[source] SqlxError),

    #[error("Query '{label}' failed: {source}")]
    Statement {
        label: &'static str,
        #[source]
        source: SqlxError,
    },

    #[error("Lifecycle response rejected with status: {0}")]
    ResponseStatus(StatusCode),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InitError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Short machine-friendly category, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InitError::Validation(_) => "validation",
            InitError::Credential(_) | InitError::Secret { .. } => "credential",
            InitError::Connection(_) => "connection",
            InitError::Statement { .. } => "statement",
            InitError::ResponseStatus(_) | InitError::Reqwest(_) => "response",
            InitError::Json(_) | InitError::Io(_) => "internal",
        }
    }
}

/// Errors that are worth another attempt when delivering a lifecycle response.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for InitError {
    fn is_retryable(&self) -> bool {
        match self {
            InitError::Reqwest(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            InitError::ResponseStatus(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_response_errors_retry() {
        assert!(InitError::ResponseStatus(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(InitError::ResponseStatus(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!InitError::ResponseStatus(StatusCode::FORBIDDEN).is_retryable());
        assert!(!InitError::validation("bad stage").is_retryable());
    }

    #[test]
    fn statement_error_names_the_query() {
        let err = InitError::Statement {
            label: "create database",
            source: SqlxError::Protocol("boom".to_string()),
        };
        assert_eq!(err.kind(), "statement");
        assert!(err.to_string().starts_with("Query 'create database' failed"));
    }
}
