//! HTTP server subsystem.
//!
//! # Data Flow
//! ```text
//! HttpRoutes (path → handler table)
//!     → routes.rs (exact and subtree path matching as an axum Router)
//!     → server.rs (interceptor chain, bind, detached serve task)
//!     → ServerHandle (graceful/forced stop for the shutdown coordinator)
//! ```

pub mod routes;
pub mod server;

pub use routes::{HttpRoutes, RouteError};
pub use server::serve_http;
