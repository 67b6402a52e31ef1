//! Error types for the reference image store

use std::fmt;

/// Errors that surface to callers of the store.
///
/// Undecodable images and files vanishing between listing and deletion are
/// recovered inside the crate and never show up here.
#[derive(Debug)]
pub enum StoreError {
    /// Caller-supplied payload could not be used (bad base64, rejected image)
    InvalidInput(String),
    Io(Box<std::io::Error>),
    /// A blocking worker panicked or was cancelled
    Task(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            StoreError::Io(err) => write!(f, "IO error: {}", err),
            StoreError::Task(msg) => write!(f, "Worker task failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
