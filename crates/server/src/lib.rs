//! Instashop server library.
//!
//! Accounts, products, and orders over a JSON HTTP API. The binary in
//! `main.rs` wires configuration, the Postgres gateway, and Sentry around
//! [`build_router`]; tests drive the same router over the in-memory gateway.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    routing::get,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Build the application router with health checks, API routes, and the
/// request middleware stack.
///
/// Sentry layers are added by the caller so tests can run without a client.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.config().request_timeout;

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .fallback(route_not_found)
        .layer(timeout_layer(request_timeout))
        .layer(axum::middleware::map_response(render_timeout))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Expired requests answer 408; the handler future is dropped.
#[allow(deprecated)]
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::new(timeout)
}

/// Give the timeout layer's bare 408 the standard error body.
async fn render_timeout(response: axum::response::Response) -> axum::response::Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        AppError::Timeout.into_response()
    } else {
        response
    }
}

async fn route_not_found() -> AppError {
    AppError::RouteNotFound
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
