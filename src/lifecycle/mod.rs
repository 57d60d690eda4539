//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (launchers in grpc/ and http/):
//!     Register services → Bind listener → Spawn detached serve task
//!     Bind/serve failure → errors.rs (ErrorSink) → supervisor.rs
//!
//! Supervision (supervisor.rs, signals.rs):
//!     SIGTERM/SIGINT or first server error → leave the select loop
//!
//! Shutdown (shutdown.rs):
//!     timeout.rs resolves deadline → graceful stop races the deadline
//!     → deadline wins: force stop
//! ```
//!
//! # Design Decisions
//! - The error sink is passed to each launcher; there is no global channel
//! - Writers to the sink never block
//! - Exactly one of {graceful, timed out} is acted on per shutdown

pub mod errors;
pub mod handle;
pub mod shutdown;
pub mod signals;
pub mod supervisor;
pub mod timeout;

pub use errors::{error_channel, ErrorSink, ServerError};
pub use handle::{ServerHandle, ServerKind, StopSignal};
pub use shutdown::{shutdown, shutdown_within, GracefulStop, ShutdownOutcome};
pub use signals::wait_for_termination;
pub use supervisor::{supervise, Exit};
pub use timeout::resolve_shutdown_timeout;
