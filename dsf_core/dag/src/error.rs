use common::error::diagnostics::DiagnosticMessage;
use common::error::ConfigError;
use minijinja::{Error as JinjaError, ErrorKind as JinjaErrorKind};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DagError {
    #[error("duplicate node: {context}")]
    DuplicateNode { context: DiagnosticMessage },
    #[error("cycle detected involving: {0:?}")]
    CycleDetected(Vec<String>),
    #[error("reference not found: {context}")]
    RefNotFound { context: DiagnosticMessage },
    #[error("template error: {context}")]
    Render {
        context: DiagnosticMessage,
        #[source]
        source: JinjaError,
    },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
    #[error("configuration error: {context}")]
    Config {
        context: DiagnosticMessage,
        #[source]
        source: ConfigError,
    },
}

impl DagError {
    #[track_caller]
    pub fn duplicate_node(node_name: impl Into<String>) -> Self {
        Self::DuplicateNode {
            context: DiagnosticMessage::new(format!(
                "Node '{}' was defined multiple times",
                node_name.into()
            )),
        }
    }

    #[track_caller]
    pub fn cycle_detected(nodes: Vec<String>) -> Self {
        Self::CycleDetected(nodes)
    }

    #[track_caller]
    pub fn ref_not_found(from: &str, name: &str) -> Self {
        Self::RefNotFound {
            context: DiagnosticMessage::new(format!("'{from}' references unknown node '{name}'")),
        }
    }

    #[track_caller]
    pub fn render(node: &str, source: JinjaError) -> Self {
        Self::Render {
            context: DiagnosticMessage::new(format!("failed to render '{node}': {source}")),
            source,
        }
    }
}

impl From<io::Error> for DagError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        let message = err.to_string();
        DagError::Io {
            context: DiagnosticMessage::new(message),
            source: err,
        }
    }
}

impl From<ConfigError> for DagError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        DagError::Config {
            context: DiagnosticMessage::new(message),
            source: err,
        }
    }
}

impl From<DagError> for JinjaError {
    fn from(err: DagError) -> Self {
        JinjaError::new(JinjaErrorKind::UndefinedError, err.to_string())
    }
}
