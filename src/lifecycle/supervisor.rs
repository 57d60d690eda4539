//! Top-level supervision loop.

use std::future::Future;

use tokio::sync::mpsc;

use crate::lifecycle::errors::ServerError;

/// Why the supervisor returned.
#[derive(Debug)]
pub enum Exit {
    /// The termination future resolved.
    Signal,
    /// A server reported a fatal error.
    ServerFailed(ServerError),
}

/// Wait for the first of: a server error, or `terminate` resolving.
///
/// This is the single reader of the error channel. If every writer is gone
/// the loop keeps waiting on `terminate`.
pub async fn supervise<F>(errors: &mut mpsc::Receiver<ServerError>, terminate: F) -> Exit
where
    F: Future<Output = ()>,
{
    tokio::pin!(terminate);
    let mut writers_alive = true;

    loop {
        tokio::select! {
            biased;
            _ = &mut terminate => return Exit::Signal,
            received = errors.recv(), if writers_alive => match received {
                Some(error) => {
                    tracing::error!(server = %error.kind(), error = %error, "Server failed; stopping");
                    return Exit::ServerFailed(error);
                }
                None => writers_alive = false,
            },
        }
    }
}
