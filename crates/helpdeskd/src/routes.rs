//! API routes for helpdeskd.
//!
//! `POST /v1/ask` runs the answer pipeline; `GET /v1/health` reports status
//! and telemetry counters. Cache status and remaining admission tokens ride
//! in headers, outside the answer body.

use crate::handler::{process_ask, AskReply, ANONYMOUS_IDENTITY};
use crate::server::AppState;
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use helpdesk_common::{AskRequest, ClarificationBody, ErrorBody};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

/// Cache-status response header.
pub const CACHE_HEADER: &str = "x-cache";
/// Remaining-admission response header.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

type AppStateArc = Arc<AppState>;

pub fn ask_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/ask", post(ask))
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health))
}

async fn ask(
    State(state): State<AppStateArc>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<AskRequest>,
) -> Response {
    let identity = identity_from(Some(addr));
    let reply = process_ask(&state, &identity, payload).await;
    into_response(reply)
}

/// Rate-limiter and telemetry key for a caller.
fn identity_from(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_IDENTITY.to_string())
}

fn into_response(reply: AskReply) -> Response {
    match reply {
        AskReply::Answer {
            answer,
            cache_hit,
            remaining,
        } => {
            let mut headers = meta_headers(remaining);
            let cache_status = if cache_hit { "HIT" } else { "MISS" };
            headers.insert(CACHE_HEADER, HeaderValue::from_static(cache_status));
            (StatusCode::OK, headers, Json(answer)).into_response()
        }
        AskReply::Clarification { question, remaining } => {
            let mut headers = meta_headers(remaining);
            headers.insert(CACHE_HEADER, HeaderValue::from_static("MISS"));
            (
                StatusCode::OK,
                headers,
                Json(ClarificationBody {
                    clarification: question,
                }),
            )
                .into_response()
        }
        AskReply::RateLimited { retry_after_secs } => {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                headers.insert(header::RETRY_AFTER, value);
            }
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(
                    ErrorBody::new("rate limit exceeded, please retry later")
                        .with_retry_after(retry_after_secs),
                ),
            )
                .into_response()
        }
        AskReply::InvalidInput { fields } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("invalid request payload").with_fields(fields)),
        )
            .into_response(),
        AskReply::Unanswerable => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody::new("could not produce an answer, please try again")),
        )
            .into_response(),
        AskReply::SchemaRejected => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorBody::new("the generated answer failed validation")),
        )
            .into_response(),
    }
}

fn meta_headers(remaining: f64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("{}", remaining.floor() as u64)) {
        headers.insert(REMAINING_HEADER, value);
    }
    headers
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    requests: crate::telemetry::TelemetrySnapshot,
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        requests: state.recorder.snapshot(),
    })
}
