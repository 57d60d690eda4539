//! The shared server error channel.
//!
//! Every launcher reports fatal startup and serve errors into one
//! [`ErrorSink`]; exactly one supervisor reads the matching receiver.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::lifecycle::handle::ServerKind;

/// Boxed error from a server library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default buffer: comfortably more than one slot per server a process starts.
pub const DEFAULT_ERROR_CAPACITY: usize = 8;

/// A fatal error from a server launcher or its serve task.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound; the server never started.
    #[error("{kind} server failed to bind {address}: {source}")]
    Bind {
        kind: ServerKind,
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The reflection service could not be built; the server never started.
    #[error("{kind} server reflection setup failed: {message}")]
    Reflection { kind: ServerKind, message: String },

    /// The server stopped serving because of an error after startup.
    #[error("{kind} server stopped serving: {source}")]
    Serve {
        kind: ServerKind,
        #[source]
        source: BoxError,
    },
}

impl ServerError {
    /// Which server produced the error.
    pub fn kind(&self) -> ServerKind {
        match self {
            Self::Bind { kind, .. } | Self::Reflection { kind, .. } | Self::Serve { kind, .. } => {
                *kind
            }
        }
    }
}

/// Write side of the error channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<ServerError>,
}

/// Create the error channel with the given buffer size.
pub fn error_channel(capacity: usize) -> (ErrorSink, mpsc::Receiver<ServerError>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ErrorSink { tx }, rx)
}

impl ErrorSink {
    /// Report an error without blocking the caller.
    ///
    /// When the buffer is full the error is handed to a task that waits for
    /// capacity. When the receiver is gone the error is logged instead.
    /// Must be called from within a Tokio runtime.
    pub fn report(&self, error: ServerError) {
        tracing::error!(server = %error.kind(), error = %error, "Server error");

        match self.tx.try_send(error) {
            Ok(()) => {}
            Err(TrySendError::Full(error)) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    if let Err(mpsc::error::SendError(error)) = tx.send(error).await {
                        tracing::error!(error = %error, "Error channel closed; server error not delivered");
                    }
                });
            }
            Err(TrySendError::Closed(error)) => {
                tracing::error!(error = %error, "Error channel closed; server error not delivered");
            }
        }
    }

    /// True once the supervisor has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
