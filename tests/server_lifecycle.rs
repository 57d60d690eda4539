//! Launching real gRPC and HTTP servers and stopping them again.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::routing::get;
use futures_util::future::BoxFuture;
use telemetry_bootstrap::grpc::{
    dial_grpc, health_service, serve_grpc, ClientConnection, ClientRegistrar, ServiceRegistrar,
};
use telemetry_bootstrap::http::{serve_http, HttpRoutes};
use telemetry_bootstrap::lifecycle::{error_channel, shutdown_within, ServerError, ShutdownOutcome};
use tokio::sync::Notify;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic::body::BoxBody;
use tonic::server::NamedService;
use tonic::service::RoutesBuilder;
use tonic_health::pb::HealthCheckRequest;
use tower::Service;

mod common;

#[tokio::test]
async fn test_http_serves_then_stops_gracefully() {
    let (errors, mut error_rx) = error_channel(4);
    let routes = HttpRoutes::new()
        .route("/healthz", get(|| async { "ok" }))
        .unwrap();

    let handle = serve_http(&errors, routes, &common::local_http())
        .await
        .expect("server should start");

    let url = format!("http://{}/healthz", handle.local_addr());
    let response = common::http_client().get(&url).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    let outcome = shutdown_within(Some(&handle), Duration::from_secs(5)).await;
    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert!(handle.is_stopped());
    assert!(error_rx.try_recv().is_err());

    // The listener is gone.
    assert!(common::http_client().get(&url).send().await.is_err());
}

#[tokio::test]
async fn test_bind_failure_reports_once_and_returns_none() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::local_http();
    config.port = taken.local_addr().unwrap().port().to_string();

    let (errors, mut error_rx) = error_channel(4);
    let handle = serve_http(&errors, HttpRoutes::new(), &config).await;

    assert!(handle.is_none());
    match error_rx.try_recv() {
        Ok(ServerError::Bind { address, .. }) => assert_eq!(address, config.bind_address()),
        other => panic!("expected a bind error, got {:?}", other),
    }
    assert!(error_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_grpc_bind_failure_reports_once() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::local_grpc();
    config.port = taken.local_addr().unwrap().port().to_string();

    let (errors, mut error_rx) = error_channel(4);
    let (_reporter, health) = health_service();
    let handle = serve_grpc(&errors, &[&health], &config).await;

    assert!(handle.is_none());
    assert!(matches!(error_rx.try_recv(), Ok(ServerError::Bind { .. })));
    assert!(error_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_slow_request_forces_stop_after_timeout() {
    let (logs, _guard) = common::capture_logs();
    let entered = Arc::new(Notify::new());
    let finished = Arc::new(AtomicBool::new(false));

    let in_handler = entered.clone();
    let done = finished.clone();
    let routes = HttpRoutes::new()
        .route(
            "/slow",
            get(move || {
                let in_handler = in_handler.clone();
                let done = done.clone();
                async move {
                    in_handler.notify_one();
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                    done.store(true, Ordering::SeqCst);
                    "done"
                }
            }),
        )
        .unwrap();

    let (errors, _error_rx) = error_channel(4);
    let handle = serve_http(&errors, routes, &common::local_http())
        .await
        .expect("server should start");

    let url = format!("http://{}/slow", handle.local_addr());
    let request = tokio::spawn(async move {
        match common::http_client().get(&url).send().await {
            Ok(response) => response.text().await,
            Err(e) => Err(e),
        }
    });
    entered.notified().await;

    let outcome = shutdown_within(Some(&handle), Duration::from_millis(200)).await;
    assert_eq!(outcome, ShutdownOutcome::TimedOut);
    assert_eq!(logs.count("HTTP server shutdown timed out"), 1);
    assert_eq!(logs.count("shut down gracefully"), 0);

    let result = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("client should see the connection end")
        .unwrap();
    assert!(result.is_err(), "in-flight request completed: {:?}", result);

    // Past the handler's own deadline: it was dropped, not left running.
    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

/// A gRPC method that never answers in time.
#[derive(Clone)]
struct StalledService {
    entered: Arc<Notify>,
    finished: Arc<AtomicBool>,
}

impl NamedService for StalledService {
    const NAME: &'static str = "telemetry.test.v1.Stalled";
}

impl Service<http::Request<BoxBody>> for StalledService {
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _request: http::Request<BoxBody>) -> Self::Future {
        let entered = self.entered.clone();
        let finished = self.finished.clone();
        Box::pin(async move {
            entered.notify_one();
            tokio::time::sleep(Duration::from_millis(1500)).await;
            finished.store(true, Ordering::SeqCst);
            Ok(http::Response::new(tonic::body::empty_body()))
        })
    }
}

impl ServiceRegistrar for StalledService {
    fn register_with_server(&self, routes: &mut RoutesBuilder) {
        routes.add_service(self.clone());
    }
}

#[tokio::test]
async fn test_grpc_forced_stop_ends_in_flight_call() {
    let stalled = StalledService {
        entered: Arc::new(Notify::new()),
        finished: Arc::new(AtomicBool::new(false)),
    };

    let (errors, _error_rx) = error_channel(4);
    let handle = serve_grpc(&errors, &[&stalled], &common::local_grpc())
        .await
        .expect("server should start");

    let url = format!("http://{}/telemetry.test.v1.Stalled/Wait", handle.local_addr());
    let call = tokio::spawn(async move {
        let client = reqwest::Client::builder()
            .http2_prior_knowledge()
            .build()
            .unwrap();
        client
            .post(&url)
            .header("content-type", "application/grpc")
            .header("te", "trailers")
            .body(vec![0u8, 0, 0, 0, 0])
            .send()
            .await
    });
    stalled.entered.notified().await;

    let outcome = shutdown_within(Some(&handle), Duration::from_millis(200)).await;
    assert_eq!(outcome, ShutdownOutcome::TimedOut);

    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("client should see the connection end")
        .unwrap();
    assert!(result.is_err(), "in-flight call completed: {:?}", result);

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert!(!stalled.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_dropped_handle_keeps_serving() {
    let (errors, _error_rx) = error_channel(4);
    let routes = HttpRoutes::new()
        .route("/healthz", get(|| async { "ok" }))
        .unwrap();

    let handle = serve_http(&errors, routes, &common::local_http())
        .await
        .expect("server should start");
    let addr = handle.local_addr();
    drop(handle);

    let response = common::http_client()
        .get(format!("http://{}/healthz", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[derive(Default)]
struct HealthClients {
    health: Option<HealthClient<ClientConnection>>,
}

impl ClientRegistrar for HealthClients {
    fn register_client(&mut self, conn: ClientConnection) {
        self.health = Some(HealthClient::new(conn));
    }
}

#[tokio::test]
async fn test_grpc_health_round_trip() {
    let (logs, _guard) = common::capture_logs();
    let (errors, mut error_rx) = error_channel(4);
    let (_reporter, health) = health_service();

    let handle = serve_grpc(&errors, &[&health], &common::local_grpc())
        .await
        .expect("server should start");

    let mut clients = HealthClients::default();
    let conn = dial_grpc(&handle.local_addr().to_string(), &mut clients, [])
        .await
        .unwrap();
    let mut client = clients.health.take().expect("registrar should be invoked");

    let response = client
        .check(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(response.into_inner().status(), ServingStatus::Serving);

    // One event from each side's logging interceptor, none added by the caller.
    let calls: Vec<String> = logs
        .contents()
        .lines()
        .filter(|line| line.contains("Call completed"))
        .map(str::to_string)
        .collect();
    assert_eq!(calls.len(), 2, "{:#?}", calls);
    assert_eq!(logs.count("side=\"client\""), 1);
    assert_eq!(logs.count("side=\"server\""), 1);
    assert!(calls.iter().all(|c| c.contains("/grpc.health.v1.Health/Check")));

    drop(client);
    drop(conn);

    let outcome = shutdown_within(Some(&handle), Duration::from_secs(5)).await;
    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert!(error_rx.try_recv().is_err());
}
