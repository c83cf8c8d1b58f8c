//! SSO API - authentication server
//!
//! Exposes registration, login, and admin checks over HTTP, issuing
//! tokens signed with the secret of the requesting application.
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use error::AppError;
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SSO API",
        description = "Multi-tenant authentication service"
    ),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::is_admin_handler,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::auth::RegisterRequest,
        handlers::auth::RegisterResponse,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::auth::IsAdminRequest,
        handlers::auth::IsAdminResponse,
        error::ApiError,
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "auth", description = "Registration, login, and admin checks")
    )
)]
pub struct ApiDoc;

/// Build the application router
///
/// Requests exceeding the configured timeout are aborted, which drops the
/// in-flight service call.
pub fn create_router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_counter_middleware,
        ))
        .layer(TimeoutLayer::new(timeout))
        .layer(axum_middleware::map_response(timeout_body))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Give timed-out requests the regular JSON error body
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        AppError::Timeout.into_response()
    } else {
        response
    }
}
