//! Schema registry support for protobuf messages.
//!
//! # Data Flow
//! ```text
//! SCHEMA_REGISTRY_URL
//!     → registry.rs (RegistryClient: subject/version lookups over REST)
//!     → codec.rs (SerdeBuilder: latest schema ID per message type)
//!     → ProtoSerde::encode / decode
//!     → wire.rs (magic byte, schema ID, message-index path, payload)
//! ```
//!
//! # Design Decisions
//! - A message type's subject is its fully-qualified protobuf name
//! - The index path defaults to `[0]` (first message in the schema file)
//!   and can be set per type for schemas declaring several messages

pub mod registry;
pub mod codec;
pub mod wire;

pub use registry::{RegistryClient, SchemaRegistryError, SchemaVersion, SubjectSchema, SCHEMA_REGISTRY_URL_ENV};
pub use codec::{ProtoSerde, SerdeBuilder, SerdeError};
pub use wire::WireError;
