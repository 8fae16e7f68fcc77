pub mod args;
pub mod invoke;
pub mod routes;

use std::any::Any;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the capability router: one `POST /<name>` per entry of the route
/// table, nothing else.
///
/// Unmatched paths get a plain `404`.  Panics inside a handler become a
/// generic `500`; the panic message is only logged.
pub fn router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    for route in state.routes.routes() {
        let name = route.capability.name.clone();
        router = router.route(
            &route.path,
            post(move |State(state): State<AppState>, body: Bytes| {
                invoke::handle(state, name.clone(), body)
            }),
        );
        tracing::debug!(path = %route.path, "capability route registered");
    }

    router
        .fallback(|| async { (StatusCode::NOT_FOUND, "not found") })
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Generic failure body for anything that is not an invocation fault.
pub(crate) fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(panic = %detail, "request handler panicked");
    internal_error()
}
