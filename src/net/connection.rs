//! Accept loop and per-connection tasks shared by both server kinds.
//!
//! # Responsibilities
//! - Accept TCP connections and serve each with HTTP/1 or HTTP/2
//! - Drain open connections when a graceful stop is requested
//! - End every connection and in-flight request when the serve future is
//!   dropped (forced stop aborts the task that owns it)

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use hyper::body::{Body, Incoming};
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower::Service;

use crate::lifecycle::errors::BoxError;
use crate::lifecycle::{ServerError, ServerKind, StopSignal};

/// Spawns connection and HTTP/2 stream tasks under one cancellation token.
///
/// hyper runs each HTTP/2 request on a task of its own, so the executor is
/// what lets a forced stop reach handlers that are still running.
#[derive(Debug, Clone, Default)]
struct ConnectionExecutor {
    tasks: TaskTracker,
    cancel: CancellationToken,
}

impl ConnectionExecutor {
    fn spawn<F>(&self, fut: F)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = fut => {}
            }
        });
    }
}

impl<F> hyper::rt::Executor<F> for ConnectionExecutor
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    fn execute(&self, fut: F) {
        self.spawn(fut);
    }
}

/// Serve `service` on every connection accepted from `listener` until `stop`
/// resolves, then drain open connections.
///
/// Dropping the returned future ends all connection tasks it spawned,
/// including requests still in flight.
pub(crate) async fn serve_connections<S, B>(
    kind: ServerKind,
    listener: TcpListener,
    service: S,
    stop: StopSignal,
) -> Result<(), ServerError>
where
    S: Service<http::Request<Incoming>, Response = http::Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let executor = ConnectionExecutor::default();
    let _abort_connections = executor.cancel.clone().drop_guard();
    let builder = auto::Builder::new(executor.clone());
    let (drain_tx, drain_rx) = watch::channel(false);

    let stop = stop.requested();
    tokio::pin!(stop);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut stop => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(server = %kind, error = %e, "Accept failed; continuing");
                    continue;
                }
                Err(e) => {
                    return Err(ServerError::Serve {
                        kind,
                        source: Box::new(e),
                    })
                }
            },
        };

        executor.spawn(serve_one(
            kind,
            stream,
            peer,
            builder.clone(),
            service.clone(),
            drain_rx.clone(),
        ));
    }

    drop(listener);
    drain_tx.send_replace(true);
    executor.tasks.close();
    executor.tasks.wait().await;
    tracing::debug!(server = %kind, "All connections drained");
    Ok(())
}

async fn serve_one<S, B>(
    kind: ServerKind,
    stream: TcpStream,
    peer: SocketAddr,
    builder: auto::Builder<ConnectionExecutor>,
    service: S,
    mut drain: watch::Receiver<bool>,
) where
    S: Service<http::Request<Incoming>, Response = http::Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(server = %kind, peer = %peer, error = %e, "Failed to set TCP_NODELAY");
    }

    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(conn);

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(server = %kind, peer = %peer, error = %e, "Connection closed with error");
                }
                break;
            }
            _ = drain.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_dropping_executor_guard_cancels_tasks() {
        let executor = ConnectionExecutor::default();
        let finished = Arc::new(AtomicBool::new(false));

        let done = finished.clone();
        executor.spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            done.store(true, Ordering::SeqCst);
        });

        drop(executor.cancel.clone().drop_guard());
        executor.tasks.close();
        tokio::time::timeout(Duration::from_secs(1), executor.tasks.wait())
            .await
            .unwrap();
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_connection_errors_are_not_fatal() {
        assert!(is_connection_error(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_connection_error(&io::Error::other("too many open files")));
    }

    #[tokio::test]
    async fn test_abort_ends_in_flight_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (_stop_tx, stop) = StopSignal::channel();
        let entered = Arc::new(Notify::new());

        let in_handler = entered.clone();
        let service = tower::service_fn(move |_req: http::Request<Incoming>| {
            let in_handler = in_handler.clone();
            async move {
                in_handler.notify_one();
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, Infallible>(http::Response::new(String::from("late")))
            }
        });

        let serving = tokio::spawn(serve_connections(ServerKind::Http, listener, service, stop));
        let request = tokio::spawn(async move {
            reqwest::Client::new()
                .get(format!("http://{}/", addr))
                .send()
                .await
        });
        entered.notified().await;

        serving.abort();
        let result = tokio::time::timeout(Duration::from_secs(5), request)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_drains_idle_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop) = StopSignal::channel();
        let service = tower::service_fn(|_req: http::Request<Incoming>| async {
            Ok::<_, Infallible>(http::Response::new(String::from("ok")))
        });

        let serving = tokio::spawn(serve_connections(ServerKind::Http, listener, service, stop));

        // Keep-alive client: its idle connection must not hold up the drain.
        let client = reqwest::Client::new();
        let body = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");

        stop_tx.send_replace(true);
        let result = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
