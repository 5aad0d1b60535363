use common::error::diagnostics::DiagnosticMessage;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("invalid request: {context}")]
    InvalidRequest { context: DiagnosticMessage },
    #[error("resource not found: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("resource already exists: {context}")]
    AlreadyExists { context: DiagnosticMessage },
    #[error("connectivity error: {context}")]
    FailedToConnect { context: DiagnosticMessage },
    #[error("unexpected response: {context}")]
    Unexpected { context: DiagnosticMessage },
}

impl ApiClientError {
    #[track_caller]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::AlreadyExists {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn failed_to_connect(message: impl Into<String>) -> Self {
        Self::FailedToConnect {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// Map a non-success status and its body onto the taxonomy.
    #[track_caller]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::invalid_request(body.to_string()),
            StatusCode::NOT_FOUND => Self::not_found(body.to_string()),
            StatusCode::CONFLICT => Self::already_exists(body.to_string()),
            status => Self::unexpected(format!(
                "status code {} with body: {body}",
                status.as_u16()
            )),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for ApiClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ApiClientError::failed_to_connect(err.to_string())
        } else if let Some(status) = err.status() {
            ApiClientError::from_status(status, &err.to_string())
        } else if err.is_decode() {
            ApiClientError::unexpected(format!("could not decode response body: {err}"))
        } else {
            ApiClientError::unexpected(format!(
                "Unexpected error trying to send request: {err}"
            ))
        }
    }
}

impl From<serde_json::Error> for ApiClientError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        ApiClientError::unexpected(format!("could not decode response body: {err}"))
    }
}
