//! Kafka client construction from the environment.

use rskafka::client::{Client, ClientBuilder};
use thiserror::Error;

use crate::config::{ConfigError, Env, ProcessEnv};

/// Comma-separated list of seed brokers.
pub const KAFKA_BROKERS_ENV: &str = "KAFKA_BROKERS";

/// Error type for Kafka client construction.
#[derive(Debug, Error)]
pub enum KafkaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to Kafka brokers {brokers:?}: {source}")]
    Connect {
        brokers: Vec<String>,
        #[source]
        source: rskafka::client::error::Error,
    },
}

/// Seed brokers for a Kafka client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
}

impl KafkaConfig {
    /// Read `KAFKA_BROKERS`. Unset or empty fails fast.
    ///
    /// Entries are trimmed and blank entries dropped.
    pub fn from_env(env: &impl Env) -> Result<Self, ConfigError> {
        let raw = env.required(KAFKA_BROKERS_ENV)?;
        let brokers: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();

        if brokers.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: KAFKA_BROKERS_ENV,
                value: raw,
                reason: "no broker addresses".to_string(),
            });
        }

        Ok(Self { brokers })
    }
}

/// Build a Kafka client from the process environment.
pub async fn new_client() -> Result<Client, KafkaError> {
    let config = KafkaConfig::from_env(&ProcessEnv)?;
    connect(&config).await
}

/// Build a Kafka client seeded with `config.brokers`.
pub async fn connect(config: &KafkaConfig) -> Result<Client, KafkaError> {
    tracing::debug!(brokers = ?config.brokers, "Connecting to Kafka");

    let client = ClientBuilder::new(config.brokers.clone())
        .build()
        .await
        .map_err(|source| KafkaError::Connect {
            brokers: config.brokers.clone(),
            source,
        })?;

    tracing::info!(brokers = ?config.brokers, "Kafka client ready");
    Ok(client)
}
