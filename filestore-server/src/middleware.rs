//! Request correlation and access logging.
//!
//! Emission semantics: every request produces exactly one `http.access`
//! event, whatever the outcome. Handler failures are already classified into
//! responses by [`crate::error::ApiError`] before the access-log layer sees
//! them, so the `outcome` field is always the status actually sent — 2xx on
//! success, the error's own status for HTTP-level refusals, 500 for
//! anything unexpected.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use std::time::Instant;
use uuid::Uuid;

use filestore_observability::AccessLogEntry;

use crate::app::AppState;

/// Header carrying the correlation id, inbound and outbound.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request-scoped correlation id, available to handlers via extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Outermost layer: reuse a non-empty inbound `x-request-id` verbatim,
/// otherwise mint a fresh uuid. The same value is written back onto every
/// response, including ones the router produced without reaching a handler.
pub async fn correlation(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(id.clone()));
    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Wraps the handler: one [`AccessLogEntry`] per request.
///
/// The wall-clock arrival time is captured before the handler runs and
/// attached explicitly so enrichment keeps it instead of stamping emission
/// time; the duration comes off the monotonic clock.
pub async fn access_log(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let arrived = Utc::now();
    let started = Instant::now();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "?".to_string());

    let response = next.run(request).await;

    let entry = AccessLogEntry {
        path,
        outcome: response.status().as_u16(),
        duration: started.elapsed().as_secs_f64(),
        request: request_id,
        arrived,
    };
    state.event_log.emit(entry.into_record()).await;
    response
}
