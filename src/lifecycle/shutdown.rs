//! Shutdown coordination for servers.
//!
//! A shutdown races the server's graceful stop against a deadline. Exactly
//! one side of the race is acted on: either the graceful stop finished, or
//! the server is force-stopped and the still-pending graceful stop is
//! dropped.

use std::time::Duration;

use async_trait::async_trait;

use crate::lifecycle::handle::ServerKind;
use crate::lifecycle::timeout::resolve_shutdown_timeout;
use crate::observability::metrics::record_shutdown;

/// What a server must support to be shut down by the coordinator.
#[async_trait]
pub trait GracefulStop: Send + Sync {
    /// Which kind of server this is (used for logs and metrics).
    fn kind(&self) -> ServerKind;

    /// Stop accepting new work and wait for in-flight work to drain.
    async fn graceful_stop(&self);

    /// Stop immediately, abandoning in-flight work.
    fn force_stop(&self);
}

/// How a shutdown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The graceful stop finished before the deadline.
    Graceful,
    /// The deadline passed first and the server was force-stopped.
    TimedOut,
    /// There was no server to stop (it never started).
    Skipped,
}

impl ShutdownOutcome {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graceful => "graceful",
            Self::TimedOut => "timed_out",
            Self::Skipped => "skipped",
        }
    }
}

/// Shut a server down, bounded by `SERVER_SHUTDOWN_TIMEOUT`.
///
/// `None` (a server whose startup failed) is a no-op. A timeout is logged as
/// a warning, never returned as an error.
pub async fn shutdown<S>(server: Option<&S>) -> ShutdownOutcome
where
    S: GracefulStop + ?Sized,
{
    if server.is_none() {
        return shutdown_within(server, Duration::ZERO).await;
    }
    shutdown_within(server, resolve_shutdown_timeout()).await
}

/// Shut a server down with an explicit deadline.
pub async fn shutdown_within<S>(server: Option<&S>, timeout: Duration) -> ShutdownOutcome
where
    S: GracefulStop + ?Sized,
{
    let Some(server) = server else {
        tracing::debug!("No server handle; skipping shutdown");
        return ShutdownOutcome::Skipped;
    };
    let kind = server.kind();

    tracing::debug!(server = %kind, timeout = ?timeout, "Shutting down server");

    let outcome = match tokio::time::timeout(timeout, server.graceful_stop()).await {
        Ok(()) => {
            tracing::info!(server = %kind, "{} server shut down gracefully", kind);
            ShutdownOutcome::Graceful
        }
        Err(_) => {
            server.force_stop();
            tracing::warn!(server = %kind, timeout = ?timeout, "{} server shutdown timed out", kind);
            ShutdownOutcome::TimedOut
        }
    };

    record_shutdown(kind, outcome);
    outcome
}
