//! Metrics tracking middleware
//!
//! Counts requests, status codes and latency per endpoint. The totals are
//! served as JSON from `/metrics`.

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    let latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}

/// Group paths that differ only by an identifier segment
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if is_uuid(seg) || is_numeric(seg) {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a string looks like a UUID
fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
