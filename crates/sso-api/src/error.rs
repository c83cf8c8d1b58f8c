//! API error handling
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Request failed validation before reaching the service
    InvalidArgument(String),
    AlreadyExists,
    WrongCredentials,
    NotFound,
    /// Request exceeded the server timeout and was cancelled
    Timeout,
    Internal,
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::InvalidArgument(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_ARGUMENT", msg.clone()),
            ),
            AppError::AlreadyExists => (
                StatusCode::CONFLICT,
                ApiError::new("ALREADY_EXISTS", "User already exists"),
            ),
            AppError::WrongCredentials => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("WRONG_CREDENTIALS", "wrong credentials"),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ApiError::new("NOT_FOUND", "User not found"),
            ),
            AppError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                ApiError::new("TIMEOUT", "request timed out"),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", "Internal Error"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AlreadyExists => AppError::AlreadyExists,
            AuthError::WrongCredentials => AppError::WrongCredentials,
            AuthError::NotFoundIdentity => AppError::NotFound,
            // Cause already logged by the service
            AuthError::Internal(_) => AppError::Internal,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing rule's message, as callers match on it
        let message = errors
            .field_errors()
            .into_values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "invalid request".to_string());

        AppError::InvalidArgument(message)
    }
}
