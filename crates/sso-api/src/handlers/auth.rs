//! Authentication API handlers
//!
//! Validates required fields, calls the authentication service, and maps
//! its outcome to an HTTP response.
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

const EMPTY_CREDENTIALS: &str = "email or password is empty";

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email or password is empty"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "email or password is empty"))]
    pub password: String,
}

/// Registration response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: i64,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "email or password is empty"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "email or password is empty"))]
    pub password: String,
    #[serde(default)]
    #[validate(range(min = 1, message = "no app_id provided"))]
    pub app_id: i32,
}

/// Login response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

/// Admin check request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct IsAdminRequest {
    #[serde(default)]
    #[validate(range(min = 1, message = "no user_id provided"))]
    pub user_id: i64,
}

/// Admin check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

/// Credentials are checked before the app id so the message is stable
/// when several fields are missing.
fn validate_login(request: &LoginRequest) -> Result<(), AppError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::InvalidArgument(EMPTY_CREDENTIALS.to_string()));
    }
    request.validate()?;
    Ok(())
}

/// Register a new user account
///
/// # Responses
///
/// * `201 Created` - User registered, returns the new id
/// * `400 Bad Request` - Malformed body, or email or password missing
/// * `409 Conflict` - Email already registered
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "User already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body?;
    request.validate()?;

    let user_id = state.auth.register(&request.email, &request.password).await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

/// Login with email and password
///
/// Returns a token signed with the secret of the requested application.
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns token
/// * `400 Bad Request` - Malformed body, missing fields or app id
/// * `401 Unauthorized` - Unknown email or wrong password
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Wrong credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body?;
    validate_login(&request)?;

    let token = state
        .auth
        .login(&request.email, &request.password, request.app_id)
        .await?;

    Ok(Json(LoginResponse { token }))
}

/// Check whether a user is an administrator
///
/// # Responses
///
/// * `200 OK` - Returns the admin flag
/// * `400 Bad Request` - Malformed body or missing user id
/// * `404 Not Found` - Unknown user id
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/api/v1/auth/is-admin",
    tag = "auth",
    request_body = IsAdminRequest,
    responses(
        (status = 200, description = "Admin flag", body = IsAdminResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn is_admin_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<IsAdminRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body?;
    request.validate()?;

    let is_admin = state.auth.is_admin(request.user_id).await?;

    Ok(Json(IsAdminResponse { is_admin }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        match err {
            AppError::InvalidArgument(msg) => msg,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_register_validation() {
        let valid = RegisterRequest {
            email: "a@x.com".to_string(),
            password: "Secret123!".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty = RegisterRequest {
            email: String::new(),
            password: String::new(),
        };
        let err = AppError::from(empty.validate().unwrap_err());
        assert_eq!(message(err), EMPTY_CREDENTIALS);
    }

    #[test]
    fn test_login_validation_order() {
        let request = LoginRequest {
            email: String::new(),
            password: "x".to_string(),
            app_id: 0,
        };
        assert_eq!(message(validate_login(&request).unwrap_err()), EMPTY_CREDENTIALS);

        let request = LoginRequest {
            email: "a@x.com".to_string(),
            password: "x".to_string(),
            app_id: 0,
        };
        assert_eq!(
            message(validate_login(&request).unwrap_err()),
            "no app_id provided"
        );
    }

    #[test]
    fn test_is_admin_validation() {
        let err = AppError::from(IsAdminRequest { user_id: 0 }.validate().unwrap_err());
        assert_eq!(message(err), "no user_id provided");
        assert!(IsAdminRequest { user_id: 3 }.validate().is_ok());
    }
}
