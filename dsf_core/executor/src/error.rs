use common::error::diagnostics::DiagnosticMessage;
use common::error::ConfigError;
use dag::error::DagError;
use shared_clients::ApiClientError;
use std::error::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("connection failed: {context}")]
    FailedToConnect {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("execution failed: {context}")]
    FailedToExecute {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("unexpected error: {context}")]
    UnexpectedError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("configuration error: {context}")]
    ConfigError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("I/O error: {context}")]
    IoError {
        context: DiagnosticMessage,
        #[source]
        source: std::io::Error,
    },
    #[error("resource not found: {context}")]
    ResourceNotFound { context: DiagnosticMessage },
    #[error("resource already exists: {context}")]
    AlreadyExists { context: DiagnosticMessage },
}

impl ExecutorError {
    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::ResourceNotFound {
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
    pub fn failed_to_execute(message: impl Into<String>) -> Self {
        Self::FailedToExecute {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn failed_to_connect(message: impl Into<String>) -> Self {
        Self::FailedToConnect {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedError {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    /// Wrap `err` as an execution failure with extra context.
    #[track_caller]
    pub fn execution<E>(message: impl Into<String>, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::FailedToExecute {
            context: DiagnosticMessage::new(message.into()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ApiClientError> for ExecutorError {
    #[track_caller]
    fn from(value: ApiClientError) -> Self {
        match value {
            ApiClientError::NotFound { context } => ExecutorError::ResourceNotFound { context },
            ApiClientError::AlreadyExists { context } => ExecutorError::AlreadyExists { context },
            ApiClientError::FailedToConnect { context } => ExecutorError::FailedToConnect {
                context,
                source: None,
            },
            ApiClientError::InvalidRequest { context } => ExecutorError::FailedToExecute {
                context,
                source: None,
            },
            ApiClientError::Unexpected { context } => ExecutorError::UnexpectedError {
                context,
                source: None,
            },
        }
    }
}

impl From<ConfigError> for ExecutorError {
    #[track_caller]
    fn from(value: ConfigError) -> Self {
        ExecutorError::ConfigError {
            context: DiagnosticMessage::new(value.to_string()),
            source: Some(Box::new(value)),
        }
    }
}

impl From<DagError> for ExecutorError {
    #[track_caller]
    fn from(value: DagError) -> Self {
        ExecutorError::ConfigError {
            context: DiagnosticMessage::new(value.to_string()),
            source: Some(Box::new(value)),
        }
    }
}

impl From<std::io::Error> for ExecutorError {
    #[track_caller]
    fn from(value: std::io::Error) -> Self {
        ExecutorError::IoError {
            context: DiagnosticMessage::new(value.to_string()),
            source: value,
        }
    }
}

impl From<csv::Error> for ExecutorError {
    #[track_caller]
    fn from(value: csv::Error) -> Self {
        if value.is_io_error() {
            if let csv::ErrorKind::Io(source) = value.into_kind() {
                return source.into();
            }
            return ExecutorError::unexpected("unreadable seed file");
        }
        ExecutorError::ConfigError {
            context: DiagnosticMessage::new(format!("invalid seed file: {value}")),
            source: Some(Box::new(value)),
        }
    }
}
