//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Launcher config (host:port)
//!     → listener.rs (resolve and bind, report failure once)
//!     → connection.rs (accept loop, one task per connection)
//!     → the gRPC or HTTP tower service, over HTTP/1 or HTTP/2
//! ```
//!
//! # Design Decisions
//! - Both server kinds share one accept loop so graceful drain and forced
//!   abort behave the same for gRPC and HTTP
//! - Connection and HTTP/2 stream tasks hang off the serve future; dropping
//!   it cancels them all

pub(crate) mod connection;
pub mod listener;

pub use listener::bind_listener;
