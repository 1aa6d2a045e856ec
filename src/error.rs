//! Error types for the request arbiter

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by an external collaborator (store, key store, chain library, UI).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("{0}")]
    Failed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Which pipeline stage family produced a failure.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("validation")]
    Validation,
    #[error("visualization")]
    Visualization,
    #[error("approval rejected")]
    Rejected,
    #[error("key resolution")]
    KeyResolution,
    #[error("signing")]
    Signing,
    #[error("broadcast")]
    Broadcast,
    #[error("empty result")]
    EmptyResult,
}

/// A pipeline failure tagged with the stage that produced it.
///
/// `stage` becomes the envelope's `method`, `cause` its `error`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} failure at {stage}: {cause}")]
pub struct StageError {
    pub kind: ErrorKind,
    pub stage: String,
    pub cause: Value,
}

impl StageError {
    pub fn new(kind: ErrorKind, stage: impl Into<String>, cause: impl Into<Value>) -> Self {
        Self {
            kind,
            stage: stage.into(),
            cause: cause.into(),
        }
    }

    pub fn validation(stage: impl Into<String>, cause: impl Into<Value>) -> Self {
        Self::new(ErrorKind::Validation, stage, cause)
    }

    pub fn rejected(stage: impl Into<String>, payload: Value) -> Self {
        Self::new(ErrorKind::Rejected, stage, payload)
    }

    /// Wrap a collaborator failure, keeping its message as the cause.
    pub fn from_collaborator(
        kind: ErrorKind,
        stage: impl Into<String>,
        err: &CollaboratorError,
    ) -> Self {
        Self::new(kind, stage, err.to_string())
    }
}
