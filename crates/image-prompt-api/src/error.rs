//! Error types for the image prompt API

use std::fmt;

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prompt_builder::{FieldError, PromptError};
use ref_image_store::StoreError;
use serde_json::json;

/// Startup errors returned from `main`
#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Store(err) => write!(f, "Reference store error: {}", err),
            ApiError::Io(err) => write!(f, "IO error: {}", err),
            ApiError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Store(err) => Some(err),
            ApiError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ApiError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ApiError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Request error type that converts to HTTP responses
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Forbidden(String),
    Unprocessable(Vec<FieldError>),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!(msg)),
            AppError::Unprocessable(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors)),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal server error"),
                )
            }
        };

        (status, axum::Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidInput(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Validation(errors) => AppError::Unprocessable(errors),
            PromptError::Malformed(msg) => {
                AppError::Unprocessable(vec![FieldError::new(["body"], msg)])
            }
            PromptError::InvalidColor(hex) => AppError::Unprocessable(vec![FieldError::new(
                ["body"],
                format!("invalid hex color {}", hex),
            )]),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
