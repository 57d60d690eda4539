//! Kafka client factory.
//!
//! # Data Flow
//! ```text
//! KAFKA_BROKERS="host1:9092,host2:9092"
//!     → client.rs (KafkaConfig::from_env, fail fast when unset)
//!     → rskafka ClientBuilder with the seed brokers
//!     → Client (topics, partitions, produce/fetch)
//! ```

pub mod client;

pub use client::{connect, new_client, KafkaConfig, KafkaError, KAFKA_BROKERS_ENV};
