//! Configuration schema definitions.
//!
//! All types derive Serde traits so the aggregate can also be loaded from a
//! TOML file. Environment variables always win over file values.

use serde::{Deserialize, Serialize};

use crate::config::env::{self, Env};

/// Root configuration for a bootstrapped service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// gRPC server listener.
    pub grpc: GrpcServerConfig,

    /// HTTP server listener.
    pub http: HttpServerConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
}

impl BootstrapConfig {
    /// Build the configuration purely from environment variables.
    pub fn from_env(env: &impl Env) -> Self {
        let mut config = Self::default();
        config.apply_env(env);
        config
    }

    /// Overlay any environment variables that are set onto this config.
    pub fn apply_env(&mut self, env: &impl Env) {
        if let Some(port) = env.non_empty(env::PORT) {
            self.grpc.port = port;
        }
        if let Some(port) = env.non_empty(env::HTTP_PORT) {
            self.http.port = port;
        }
        if let Some(addr) = env.non_empty(env::METRICS_ADDR) {
            self.metrics.address = addr;
        }
        if let Some(format) = env.non_empty(env::LOG_FORMAT) {
            match format.parse() {
                Ok(format) => self.logging.format = format,
                Err(()) => tracing::warn!(
                    value = %format,
                    "Invalid LOG_FORMAT value; keeping {}",
                    self.logging.format
                ),
            }
        }
    }
}

/// gRPC listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrpcServerConfig {
    /// Interface to bind (all interfaces by default).
    pub host: String,

    /// Port to bind. Kept as a string: an unusable value is a bind error
    /// reported through the error sink, not a configuration error.
    pub port: String,
}

impl GrpcServerConfig {
    /// Build from `PORT`, defaulting to `50051`.
    pub fn from_env(env: &impl Env) -> Self {
        let mut config = Self::default();
        if let Some(port) = env.non_empty(env::PORT) {
            config.port = port;
        }
        config
    }

    /// The `host:port` string handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GrpcServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "50051".to_string(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpServerConfig {
    /// Interface to bind (all interfaces by default).
    pub host: String,

    /// Port to bind.
    pub port: String,
}

impl HttpServerConfig {
    /// Build from `HTTP_PORT`, defaulting to `8080`.
    pub fn from_env(env: &impl Env) -> Self {
        let mut config = Self::default();
        if let Some(port) = env.non_empty(env::HTTP_PORT) {
            config.port = port;
        }
        config
    }

    /// The `host:port` string handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "8080".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,

    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_filter: "telemetry_bootstrap=info,tower_http=info".to_string(),
        }
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint bind address.
    pub address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: "0.0.0.0:9090".to_string(),
        }
    }
}
