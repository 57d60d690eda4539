//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::env::Env;
use crate::config::schema::BootstrapConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("{0} environment variable not set")]
    MissingEnv(&'static str),

    /// An environment variable is set but unusable.
    #[error("invalid {key} value {value:?}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file, overlay environment variables, then validate the
/// result.
pub fn load_config(path: &Path, env: &impl Env) -> Result<BootstrapConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: BootstrapConfig = toml::from_str(&content)?;

    config.apply_env(env);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build the configuration from environment variables alone and validate it.
pub fn load_env_config(env: &impl Env) -> Result<BootstrapConfig, ConfigError> {
    let config = BootstrapConfig::from_env(env);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
