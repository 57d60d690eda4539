//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use telemetry_bootstrap::config::{GrpcServerConfig, HttpServerConfig};
use tracing::subscriber::DefaultGuard;

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Number of log lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's log output into memory until the guard drops.
///
/// `#[tokio::test]` runs on a current-thread runtime, so spawned server
/// tasks log through the same subscriber.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

/// gRPC config bound to an ephemeral loopback port.
pub fn local_grpc() -> GrpcServerConfig {
    GrpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: "0".to_string(),
    }
}

/// HTTP config bound to an ephemeral loopback port.
pub fn local_http() -> HttpServerConfig {
    HttpServerConfig {
        host: "127.0.0.1".to_string(),
        port: "0".to_string(),
    }
}

/// Client that closes each connection after its response.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}
