//! Configuration validation.
//!
//! Semantic checks on the merged file and environment configuration.
//! Serde handles syntax.
//! All problems are returned, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BootstrapConfig;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a valid port")]
    InvalidPort { field: &'static str, value: String },

    #[error("{field}: {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("grpc and http both bind {0}")]
    PortConflict(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &BootstrapConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_port("grpc.port", &config.grpc.port, &mut errors);
    check_port("http.port", &config.http.port, &mut errors);

    if config.grpc.port != "0" && config.grpc.bind_address() == config.http.bind_address() {
        errors.push(ValidationError::PortConflict(config.grpc.bind_address()));
    }

    if config.metrics.enabled && config.metrics.address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "metrics.address",
            value: config.metrics.address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_port(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<u16>().is_err() {
        errors.push(ValidationError::InvalidPort {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&BootstrapConfig::default()).is_ok());
    }

    #[test]
    fn test_port_conflict() {
        let mut config = BootstrapConfig::default();
        config.http.port = config.grpc.port.clone();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::PortConflict("0.0.0.0:50051".to_string())]
        );
    }

    #[test]
    fn test_disabled_metrics_address_is_not_checked() {
        let mut config = BootstrapConfig::default();
        config.metrics.enabled = false;
        config.metrics.address = "garbage".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
