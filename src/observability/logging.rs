//! Structured logging.
//!
//! Subscriber setup for the process, plus the logging interceptor used on
//! both sides of every gRPC and HTTP call.

use std::fmt::Display;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::future::BoxFuture;
use http::{Request, Response};
use tower::{Layer, Service};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::observability::grpc_status;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured default filter.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
    }
}

/// Which end of a call is logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSide {
    Client,
    Server,
}

impl CallSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

/// Logs one event per completed call: method, path, status, latency.
#[derive(Debug, Clone, Copy)]
pub struct LogLayer {
    side: CallSide,
}

impl LogLayer {
    pub fn server() -> Self {
        Self { side: CallSide::Server }
    }

    pub fn client() -> Self {
        Self { side: CallSide::Client }
    }
}

impl<S> Layer<S> for LogLayer {
    type Service = LogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LogService {
            inner,
            side: self.side,
        }
    }
}

/// Service produced by [`LogLayer`].
#[derive(Debug, Clone)]
pub struct LogService<S> {
    inner: S,
    side: CallSide,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for LogService<S>
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
        let side = self.side.as_str();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();
        let start = Instant::now();
        let call = self.inner.call(request);

        Box::pin(async move {
            let result = call.await;
            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

            match &result {
                Ok(response) => tracing::info!(
                    side,
                    method = %method,
                    path = %path,
                    status = response.status().as_u16(),
                    grpc_status = grpc_status(response.headers()),
                    latency_ms,
                    "Call completed"
                ),
                Err(e) => tracing::warn!(
                    side,
                    method = %method,
                    path = %path,
                    error = %e,
                    latency_ms,
                    "Call failed"
                ),
            }

            result
        })
    }
}
