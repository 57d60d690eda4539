//! Environment variable lookup.
//!
//! Every env-driven decision in the crate goes through [`Env`] so it can be
//! exercised in tests without mutating the process environment.

use std::collections::HashMap;

use crate::config::loader::ConfigError;

/// gRPC bind port.
pub const PORT: &str = "PORT";
/// HTTP bind port.
pub const HTTP_PORT: &str = "HTTP_PORT";
/// Prometheus exporter bind address.
pub const METRICS_ADDR: &str = "METRICS_ADDR";
/// Log output format (`json` or `pretty`).
pub const LOG_FORMAT: &str = "LOG_FORMAT";

/// A source of environment-style key/value settings.
pub trait Env {
    /// Look up `key`. Unset and non-unicode values are both `None`.
    fn var(&self, key: &str) -> Option<String>;

    /// Look up `key`, treating an empty value the same as an unset one.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|v| !v.is_empty())
    }

    /// Look up a required `key`, failing fast when it is unset or empty.
    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.non_empty(key).ok_or(ConfigError::MissingEnv(key))
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Env for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl Env for HashMap<&str, &str> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_value_is_unset() {
        let env = HashMap::from([("A", ""), ("B", "x")]);
        assert_eq!(env.var("A").as_deref(), Some(""));
        assert!(env.non_empty("A").is_none());
        assert_eq!(env.non_empty("B").as_deref(), Some("x"));
        assert!(env.non_empty("C").is_none());
    }

    #[test]
    fn test_required_fails_fast() {
        let env: HashMap<&str, &str> = HashMap::new();
        let err = env.required("KAFKA_BROKERS").unwrap_err();
        assert_eq!(
            err.to_string(),
            "KAFKA_BROKERS environment variable not set"
        );
    }
}
