//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (PORT, HTTP_PORT, METRICS_ADDR, ...)
//!     → env.rs (Env lookup, testable with a map)
//!     → schema.rs (BootstrapConfig::from_env)
//!     → validation.rs (semantic checks)
//!
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → env overrides applied on top
//!     → validation.rs (semantic checks on the merged result)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow an empty environment
//! - Required settings (Kafka brokers, schema registry URL) fail fast
//!   at construction time, owned by the modules that need them
//! - The shutdown timeout is deliberately not part of the aggregate; it is
//!   resolved fresh on every shutdown (see `lifecycle::timeout`)

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{Env, ProcessEnv};
pub use loader::{load_config, load_env_config, ConfigError};
pub use schema::{
    BootstrapConfig, GrpcServerConfig, HttpServerConfig, LogFormat, LoggingConfig, MetricsConfig,
};
