//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::auth;
use crate::state::AppState;
use axum::{routing::post, Router};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/is-admin", post(auth::is_admin_handler))
}
