//! Error types for prompt construction

use serde::Serialize;
use std::fmt;

/// One failed constraint, located by its path in the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldError {
    pub fn new<I, S>(loc: I, msg: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
        }
    }
}

#[derive(Debug)]
pub enum PromptError {
    /// Body is not well-formed JSON or has missing/mistyped fields
    Malformed(String),
    Validation(Vec<FieldError>),
    InvalidColor(String),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Malformed(msg) => write!(f, "Malformed form data: {}", msg),
            PromptError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", err.loc.join("."), err.msg)?;
                }
                Ok(())
            }
            PromptError::InvalidColor(hex) => write!(f, "Invalid hex color: {}", hex),
        }
    }
}

impl std::error::Error for PromptError {}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
