//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every call through a launched server or a dialed channel:
//!     → logging.rs (LogLayer: one structured event per call)
//!     → metrics.rs (MetricsLayer: counters and latency histograms)
//!     → tracing.rs (TraceLayer: span per call with correlation headers)
//!     → service / routing table
//!
//! Process-wide setup (binary entry point only):
//!     → logging::init_logging (subscriber, filter, format)
//!     → metrics::init_metrics (Prometheus scrape endpoint)
//! ```
//!
//! # Design Decisions
//! - Layers are ordinary tower middleware, so the same chain serves tonic
//!   and axum, and covers unary and streaming calls alike
//! - The chain order is fixed: logging, then metrics, then tracing
//! - Client channels get the logging layer only

pub mod logging;
pub mod metrics;
pub mod tracing;

use http::HeaderMap;

pub use self::logging::{init_logging, CallSide, LogLayer, LogService};
pub use self::metrics::{init_metrics, MetricsLayer, MetricsService};
pub use self::tracing::{grpc_trace_layer, http_trace_layer, RpcSpan};

/// The `grpc-status` response header, present on trailers-only responses.
pub(crate) fn grpc_status(headers: &HeaderMap) -> Option<&str> {
    headers.get("grpc-status").and_then(|v| v.to_str().ok())
}
