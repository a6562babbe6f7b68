//! Middleware stack for the API server
//!
//! Stamps every request with an `x-trace-id`, wires the tracing span, and
//! bounds request time.

use axum::{body::Body, http::Request, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::extractors::TRACE_HEADER;
use crate::state::AppState;

/// Apply the middleware stack to the router
pub fn apply_middleware(router: Router<AppState>) -> Router<AppState> {
    let trace_header = axum::http::header::HeaderName::from_static(TRACE_HEADER);
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(trace_header.clone(), MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(trace_header))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| {
                        let trace_id = request
                            .headers()
                            .get(TRACE_HEADER)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            trace_id = %trace_id,
                        )
                    })
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::new(Duration::from_secs(30))),
    )
}
