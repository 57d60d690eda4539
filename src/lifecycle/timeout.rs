//! Shutdown timeout resolution.

use std::time::Duration;

use crate::config::{Env, ProcessEnv};

/// Environment variable holding the shutdown timeout in whole seconds.
pub const SHUTDOWN_TIMEOUT_ENV: &str = "SERVER_SHUTDOWN_TIMEOUT";

/// Used when the variable is unset, empty or unparseable.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve the shutdown timeout from the process environment.
///
/// Read on every call; nothing is cached between shutdowns.
pub fn resolve_shutdown_timeout() -> Duration {
    shutdown_timeout_from(&ProcessEnv)
}

/// Resolve the shutdown timeout from an explicit environment source.
pub fn shutdown_timeout_from(env: &impl Env) -> Duration {
    parse_shutdown_timeout(env.var(SHUTDOWN_TIMEOUT_ENV).as_deref())
}

/// Interpret a raw `SERVER_SHUTDOWN_TIMEOUT` value.
///
/// An invalid value is logged and replaced by the default; it never fails
/// the caller.
pub fn parse_shutdown_timeout(raw: Option<&str>) -> Duration {
    match raw {
        None | Some("") => DEFAULT_SHUTDOWN_TIMEOUT,
        Some(value) => match value.parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                tracing::warn!(
                    value = %value,
                    error = %e,
                    "Invalid SERVER_SHUTDOWN_TIMEOUT value; using default"
                );
                DEFAULT_SHUTDOWN_TIMEOUT
            }
        },
    }
}
