//! Metrics collection and exposition.
//!
//! # Metrics
//! - `server_requests_total` (counter): calls by server, operation, code
//! - `server_request_duration_seconds` (histogram): call latency
//! - `server_shutdowns_total` (counter): shutdowns by server, outcome
//!
//! `operation` is the RPC path for gRPC (`/pkg.Service/Method`) and the
//! request method for HTTP, which keeps label cardinality bounded. `code` is
//! the `grpc-status` header when the response carries one, otherwise the
//! HTTP status.

use std::fmt::Display;
use std::net::SocketAddr;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::future::BoxFuture;
use http::{Request, Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tower::{Layer, Service};

use crate::lifecycle::{ServerKind, ShutdownOutcome};
use crate::observability::grpc_status;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe() {
    metrics::describe_counter!("server_requests_total", "Calls handled, by server, operation and code");
    metrics::describe_histogram!(
        "server_request_duration_seconds",
        metrics::Unit::Seconds,
        "Call latency, by server and operation"
    );
    metrics::describe_counter!("server_shutdowns_total", "Server shutdowns, by outcome");
}

/// Record one completed call.
pub fn record_request(kind: ServerKind, operation: String, code: String, start: Instant) {
    let server = kind.as_str();
    metrics::counter!(
        "server_requests_total",
        "server" => server,
        "operation" => operation.clone(),
        "code" => code
    )
    .increment(1);
    metrics::histogram!(
        "server_request_duration_seconds",
        "server" => server,
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record how a shutdown ended.
pub fn record_shutdown(kind: ServerKind, outcome: ShutdownOutcome) {
    metrics::counter!(
        "server_shutdowns_total",
        "server" => kind.as_str(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// Records request count and latency for every call through a server.
#[derive(Debug, Clone, Copy)]
pub struct MetricsLayer {
    kind: ServerKind,
}

impl MetricsLayer {
    pub fn new(kind: ServerKind) -> Self {
        Self { kind }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            kind: self.kind,
        }
    }
}

/// Service produced by [`MetricsLayer`].
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
    kind: ServerKind,
}

impl<S> MetricsService<S> {
    fn operation<B>(&self, request: &Request<B>) -> String {
        match self.kind {
            ServerKind::Grpc => request.uri().path().to_owned(),
            ServerKind::Http => request.method().to_string(),
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Display + 'static,
    ResBody: 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let kind = self.kind;
        let operation = self.operation(&request);
        let start = Instant::now();
        let call = self.inner.call(request);

        Box::pin(async move {
            let result = call.await;
            let code = match &result {
                Ok(response) => grpc_status(response.headers())
                    .map(str::to_owned)
                    .unwrap_or_else(|| response.status().as_u16().to_string()),
                Err(_) => "error".to_string(),
            };
            record_request(kind, operation, code, start);
            result
        })
    }
}
