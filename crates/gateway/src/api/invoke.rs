//! `POST /<capability>` handler.

use std::time::Instant;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mb_client::{InvocationError, InvocationErrorKind};
use mb_domain::trace::TraceEvent;
use serde_json::json;

use super::args::{bind, parse_body};
use super::internal_error;
use crate::state::AppState;

pub async fn handle(state: AppState, capability: String, body: Bytes) -> Response {
    let Some(route) = state.routes.get(&capability) else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let args = match parse_body(&body) {
        Ok(args) => args,
        Err(e) => {
            tracing::error!(capability = %capability, error = %e, "rejected request body");
            return internal_error();
        }
    };

    let started = Instant::now();
    let outcome = match bind(args, &route.capability) {
        Ok(args) => state.client.invoke(&capability, args).await,
        Err(e) => Err(e),
    };

    TraceEvent::CapabilityInvoked {
        capability: capability.clone(),
        ok: outcome.is_ok(),
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();

    match outcome {
        Ok(result) => (StatusCode::OK, Json(json!({ "result": result }))).into_response(),
        Err(e) => {
            tracing::warn!(capability = %capability, kind = %e.kind(), error = %e, "invocation failed");
            error_response(&e, state.config.gateway.tagged_errors)
        }
    }
}

/// Map an invocation failure to a response.  Untagged, every failure is
/// `500 {"error": <message>}`.
pub fn error_response(err: &InvocationError, tagged: bool) -> Response {
    if !tagged {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err.message() })),
        )
            .into_response();
    }
    let status = match err.kind() {
        InvocationErrorKind::Validation => StatusCode::BAD_REQUEST,
        InvocationErrorKind::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        InvocationErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        InvocationErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "error": err.message(), "kind": err.kind().as_str() })),
    )
        .into_response()
}
