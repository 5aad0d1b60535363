pub mod diagnostics;
pub use crate::config::error::ConfigError;
pub use diagnostics::DiagnosticMessage;

use std::{error::Error as StdError, fmt::Debug};
use thiserror::Error;

/// Top level error surfaced by the `dsf` binary.
#[derive(Debug, Error)]
pub enum DsfError {
    #[error("initialisation failed: {context}")]
    Init {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("compile failed: {context}")]
    Compile {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("run failed: {context}")]
    Run {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl DsfError {
    #[track_caller]
    pub fn init<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DsfError::Init {
            context: DiagnosticMessage::new(err.to_string()),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn init_msg(message: impl Into<String>) -> Self {
        DsfError::Init {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn compile<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DsfError::Compile {
            context: DiagnosticMessage::new(err.to_string()),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn compile_msg(message: impl Into<String>) -> Self {
        DsfError::Compile {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn run<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        DsfError::Run {
            context: DiagnosticMessage::new(err.to_string()),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn run_msg(message: impl Into<String>) -> Self {
        DsfError::Run {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }
}
