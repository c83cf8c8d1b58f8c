//! Request accounting middleware
//!
//! Counts handled requests and logs their latency and status.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Count every request and record its outcome at debug level
pub async fn request_counter_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.increment_requests();

    let response = next.run(request).await;

    tracing::debug!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_us = start.elapsed().as_micros() as u64,
        "request handled"
    );

    response
}
