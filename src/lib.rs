//! Bootstrap helpers for telemetry microservices.
//!
//! gRPC servers and clients with a standard interceptor chain, an HTTP server
//! with graceful shutdown, a Kafka client factory, and a protobuf
//! schema-registry serde. Servers report fatal errors to a shared
//! [`lifecycle::ErrorSink`] and are stopped with [`lifecycle::shutdown`].

pub mod config;
pub mod grpc;
pub mod http;
pub mod kafka;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod schema;

pub use config::BootstrapConfig;
pub use grpc::{dial_grpc, serve_grpc, ClientRegistrar, ServiceRegistrar};
pub use self::http::{serve_http, HttpRoutes};
pub use lifecycle::{error_channel, shutdown, ErrorSink, ServerError, ServerHandle};
