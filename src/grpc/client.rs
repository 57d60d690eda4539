//! Outbound gRPC channels.
//!
//! Every channel is wrapped in the client logging interceptor before any
//! caller option is considered, so callers can tune the endpoint but never
//! lose the baseline logging.

use std::time::Duration;

use thiserror::Error;
use tonic::transport::{Channel, Endpoint};
use tower::ServiceBuilder;

use crate::observability::{LogLayer, LogService};

/// Connect timeout applied before caller options.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A dialed channel with the baseline interceptors in front of it.
///
/// Generated clients accept it directly: `FooClient::new(conn)`.
pub type ClientConnection = LogService<Channel>;

/// Something that builds client stubs on a freshly dialed connection.
pub trait ClientRegistrar {
    fn register_client(&mut self, conn: ClientConnection);
}

/// Caller-supplied dial settings, applied in order after the baseline.
#[derive(Debug, Clone)]
pub enum DialOption {
    /// Override the baseline connect timeout.
    ConnectTimeout(Duration),
    /// Deadline for each request.
    Timeout(Duration),
    UserAgent(String),
    /// HTTP/2 keep-alive ping interval.
    KeepAliveInterval(Duration),
    /// Maximum concurrent requests on the channel.
    ConcurrencyLimit(usize),
    /// Return immediately and connect on first use.
    Lazy,
}

/// Error type for dialing.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("invalid gRPC target {target:?}: {source}")]
    InvalidTarget {
        target: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("invalid dial option {option:?}: {source}")]
    InvalidOption {
        option: DialOption,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: tonic::transport::Error,
    },
}

/// Dial `target` and hand the connection to `registrar`.
///
/// A bare `host:port` target is dialed over plaintext HTTP/2. On failure the
/// registrar is not invoked.
pub async fn dial_grpc<R>(
    target: &str,
    registrar: &mut R,
    options: impl IntoIterator<Item = DialOption>,
) -> Result<ClientConnection, DialError>
where
    R: ClientRegistrar + ?Sized,
{
    let uri = normalize_target(target);
    let mut endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|source| DialError::InvalidTarget {
            target: target.to_string(),
            source,
        })?
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT);

    let mut lazy = false;
    for option in options {
        endpoint = match option {
            DialOption::ConnectTimeout(timeout) => endpoint.connect_timeout(timeout),
            DialOption::Timeout(timeout) => endpoint.timeout(timeout),
            DialOption::UserAgent(ref agent) => endpoint
                .user_agent(agent.clone())
                .map_err(|source| DialError::InvalidOption {
                    option: option.clone(),
                    source,
                })?,
            DialOption::KeepAliveInterval(interval) => endpoint.http2_keep_alive_interval(interval),
            DialOption::ConcurrencyLimit(limit) => endpoint.concurrency_limit(limit),
            DialOption::Lazy => {
                lazy = true;
                endpoint
            }
        };
    }

    let channel = if lazy {
        endpoint.connect_lazy()
    } else {
        endpoint
            .connect()
            .await
            .map_err(|source| DialError::Connect {
                target: uri.clone(),
                source,
            })?
    };

    tracing::debug!(endpoint = %uri, lazy, "gRPC channel ready");

    let conn = ServiceBuilder::new().layer(LogLayer::client()).service(channel);
    registrar.register_client(conn.clone());
    Ok(conn)
}

fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}
