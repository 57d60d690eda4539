//! gRPC subsystem.
//!
//! # Data Flow
//! ```text
//! Server side:
//!     ServiceRegistrar(s) → RoutesBuilder
//!     → server.rs (reflection, interceptor chain, bind, detached serve)
//!     → ServerHandle
//!
//! Client side:
//!     target → client.rs (baseline options, caller DialOptions, connect)
//!     → logging interceptor → ClientRegistrar builds stubs
//! ```
//!
//! # Design Decisions
//! - Registrars are one-method traits; services plug in without this crate
//!   knowing their types
//! - Reflection is always on; registrars contribute descriptor sets
//! - The standard health service is available as a ready-made registrar

pub mod client;
pub mod health;
pub mod server;

pub use client::{dial_grpc, ClientConnection, ClientRegistrar, DialError, DialOption};
pub use health::{health_service, HealthRegistrar};
pub use server::{serve_grpc, ServiceRegistrar};
