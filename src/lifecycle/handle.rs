//! Handles to running servers.

use std::future::Future;
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::lifecycle::errors::{ErrorSink, ServerError};
use crate::lifecycle::shutdown::GracefulStop;

/// Which kind of server a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServerKind {
    Grpc,
    Http,
}

impl ServerKind {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        }
    }
}

impl std::fmt::Display for ServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grpc => write!(f, "gRPC"),
            Self::Http => write!(f, "HTTP"),
        }
    }
}

/// Future handed to a server library as its graceful-shutdown trigger.
///
/// Resolves when [`ServerHandle`] requests a graceful stop. If the handle is
/// dropped instead, it never resolves and the server keeps running.
#[derive(Debug)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// A signal and the sender that requests the stop.
    pub(crate) fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// Wait until a graceful stop is requested.
    pub async fn requested(mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Handle to a server running on a detached task.
///
/// Graceful stop flips the [`StopSignal`] and waits for the serve task to
/// return. Forced stop aborts the serve task; the connection tasks it owns
/// end with it.
#[derive(Debug)]
pub struct ServerHandle {
    kind: ServerKind,
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    stopped_rx: watch::Receiver<bool>,
    abort: AbortHandle,
}

impl ServerHandle {
    /// Spawn `serve` on a detached task.
    ///
    /// The task's only channel back is `errors`: a serve error is reported
    /// there exactly once.
    pub(crate) fn spawn<F, Fut>(
        kind: ServerKind,
        local_addr: SocketAddr,
        errors: ErrorSink,
        serve: F,
    ) -> Self
    where
        F: FnOnce(StopSignal) -> Fut,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        let (stop_tx, stop) = StopSignal::channel();
        let (stopped_tx, stopped_rx) = watch::channel(false);

        let serving = serve(stop);
        let task = tokio::spawn(async move {
            if let Err(e) = serving.await {
                errors.report(e);
            }
            stopped_tx.send_replace(true);
            tracing::debug!(server = %kind, address = %local_addr, "Serve task finished");
        });

        Self {
            kind,
            local_addr,
            stop_tx,
            stopped_rx,
            abort: task.abort_handle(),
        }
    }

    /// Which kind of server this is.
    pub fn kind(&self) -> ServerKind {
        self.kind
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// True once the serve task has returned on its own.
    pub fn is_stopped(&self) -> bool {
        *self.stopped_rx.borrow()
    }
}

#[async_trait]
impl GracefulStop for ServerHandle {
    fn kind(&self) -> ServerKind {
        self.kind
    }

    async fn graceful_stop(&self) {
        self.stop_tx.send_replace(true);
        let mut stopped = self.stopped_rx.clone();
        // Err means the serve task was aborted, which also ends serving.
        let _ = stopped.wait_for(|done| *done).await;
    }

    fn force_stop(&self) {
        self.abort.abort();
    }
}
