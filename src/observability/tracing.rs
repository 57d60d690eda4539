//! Distributed tracing support.
//!
//! Wraps tower-http's `TraceLayer` with a span that carries the call's
//! correlation headers, so events logged while handling a call can be tied
//! back to the caller's trace.

use ::tracing::Span;
use http::Request;
use tower_http::classify::{GrpcErrorsAsFailures, ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{MakeSpan, TraceLayer};

use crate::lifecycle::ServerKind;

/// Trace layer used by launched gRPC servers.
pub type GrpcTraceLayer = TraceLayer<SharedClassifier<GrpcErrorsAsFailures>, RpcSpan>;

/// Trace layer used by launched HTTP servers.
pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RpcSpan>;

pub fn grpc_trace_layer() -> GrpcTraceLayer {
    TraceLayer::new_for_grpc().make_span_with(RpcSpan::new(ServerKind::Grpc))
}

pub fn http_trace_layer() -> HttpTraceLayer {
    TraceLayer::new_for_http().make_span_with(RpcSpan::new(ServerKind::Http))
}

/// Builds the per-call span.
#[derive(Debug, Clone, Copy)]
pub struct RpcSpan {
    kind: ServerKind,
}

impl RpcSpan {
    pub fn new(kind: ServerKind) -> Self {
        Self { kind }
    }
}

impl<B> MakeSpan<B> for RpcSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        ::tracing::info_span!(
            "request",
            server = self.kind.as_str(),
            method = %request.method(),
            path = %request.uri().path(),
            request_id = header(request, "x-request-id"),
            traceparent = header(request, "traceparent"),
        )
    }
}

fn header<'a, B>(request: &'a Request<B>, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
