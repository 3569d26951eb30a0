//! Application-level errors (wraps domain errors)

use std::error::Error as _;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::SwcError;

/// Application errors wrap domain errors and add file-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{path}: {source}")]
    Domain {
        path: PathBuf,
        #[source]
        source: DomainError,
    },

    #[error("cannot parse {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: SwcError,
    },

    #[error("unsupported morphology format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("input not found: {0}")]
    NotFound(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Message including every `source` in the chain.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
