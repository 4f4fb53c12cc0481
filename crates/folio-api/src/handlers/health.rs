//! Health check handlers

use crate::state::{AppState, EndpointMetrics};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_info: BuildInfo,
}

#[derive(Serialize, ToSchema)]
pub struct BuildInfo {
    pub name: String,
    pub environment: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_info: BuildInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            environment: state.config.server.environment.to_string(),
        },
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    pub user_store: bool,
    pub revocation_store: bool,
}

/// Readiness probe - checks the stores answer
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let checks = ReadinessChecks {
        user_store: state.users.count().await.is_ok(),
        revocation_store: state.revocations.stats().await.is_ok(),
    };

    let ready = state.is_ready() && checks.user_store && checks.revocation_store;
    let response = ReadinessResponse { ready, checks };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// JSON metrics response
#[derive(Serialize)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub registered_users: usize,
    pub active_refresh_tokens: usize,
    pub blacklisted_tokens: usize,
    pub endpoints: BTreeMap<String, EndpointMetricsView>,
}

#[derive(Serialize)]
pub struct EndpointMetricsView {
    #[serde(flatten)]
    pub totals: EndpointMetrics,
    pub avg_latency_us: u64,
}

/// Request counters and store sizes
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses(
        (status = 200, description = "Request and store counters")
    )
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    let registered_users = state.users.count().await.unwrap_or_default();
    let revocation = state.revocations.stats().await.unwrap_or_default();

    let endpoints = state
        .endpoint_metrics()
        .await
        .into_iter()
        .map(|(endpoint, totals)| {
            let avg_latency_us = totals.avg_latency_us();
            (
                endpoint,
                EndpointMetricsView {
                    totals,
                    avg_latency_us,
                },
            )
        })
        .collect();

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        registered_users,
        active_refresh_tokens: revocation.active_refresh_tokens,
        blacklisted_tokens: revocation.blacklisted_tokens,
        endpoints,
    })
}
