//! Protobuf serde keyed by schema registry IDs.

use std::any::TypeId;
use std::collections::HashMap;

use prost::{Message, Name};
use thiserror::Error;

use crate::schema::registry::{RegistryClient, SchemaRegistryError, SchemaVersion};
use crate::schema::wire::{self, WireError};

/// Errors encoding or decoding framed messages.
#[derive(Debug, Error)]
pub enum SerdeError {
    #[error("message type {0} is not registered")]
    UnregisteredType(String),

    #[error("schema id {0} is not registered")]
    UnknownSchemaId(u32),

    #[error("schema id {id} is registered for {registered}, not {requested}")]
    TypeMismatch {
        id: u32,
        registered: String,
        requested: String,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("protobuf encode failed: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("protobuf decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

#[derive(Debug, Clone)]
struct Registration {
    schema_id: u32,
    index: Vec<i32>,
    full_name: String,
}

/// Encodes and decodes registered protobuf messages in the registry's wire
/// format.
#[derive(Debug, Default, Clone)]
pub struct ProtoSerde {
    by_type: HashMap<TypeId, Registration>,
    by_id: HashMap<u32, TypeId>,
}

impl ProtoSerde {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `M` under `schema_id` with message-index path `index`.
    ///
    /// Registering the same type again replaces its earlier entry. An empty
    /// `index` is stored as `[0]`, the path it is framed as.
    pub fn register<M>(&mut self, schema_id: u32, mut index: Vec<i32>)
    where
        M: Message + Name + 'static,
    {
        if index.is_empty() {
            index.push(0);
        }
        let type_id = TypeId::of::<M>();
        if let Some(old) = self.by_type.remove(&type_id) {
            self.by_id.remove(&old.schema_id);
        }
        self.by_type.insert(
            type_id,
            Registration {
                schema_id,
                index,
                full_name: M::full_name(),
            },
        );
        self.by_id.insert(schema_id, type_id);
    }

    /// The schema ID `M` is registered under.
    pub fn schema_id_of<M: 'static>(&self) -> Option<u32> {
        self.by_type.get(&TypeId::of::<M>()).map(|r| r.schema_id)
    }

    /// The message-index path `M` is framed with.
    pub fn index_of<M: 'static>(&self) -> Option<&[i32]> {
        self.by_type.get(&TypeId::of::<M>()).map(|r| r.index.as_slice())
    }

    /// Frame `message` with its schema header.
    pub fn encode<M>(&self, message: &M) -> Result<Vec<u8>, SerdeError>
    where
        M: Message + Name + 'static,
    {
        let registration = self
            .by_type
            .get(&TypeId::of::<M>())
            .ok_or_else(|| SerdeError::UnregisteredType(M::full_name()))?;

        let mut buf = Vec::with_capacity(6 + message.encoded_len());
        wire::encode_header(&mut buf, registration.schema_id, &registration.index);
        message.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode a framed payload as `M`.
    ///
    /// Fails when the payload's schema ID is unknown or belongs to a
    /// different message type.
    pub fn decode<M>(&self, bytes: &[u8]) -> Result<M, SerdeError>
    where
        M: Message + Name + Default + 'static,
    {
        let (schema_id, _index, payload) = wire::decode_header(bytes)?;

        let type_id = self
            .by_id
            .get(&schema_id)
            .ok_or(SerdeError::UnknownSchemaId(schema_id))?;
        if *type_id != TypeId::of::<M>() {
            let registered = self
                .by_type
                .get(type_id)
                .map(|r| r.full_name.clone())
                .unwrap_or_default();
            return Err(SerdeError::TypeMismatch {
                id: schema_id,
                registered,
                requested: M::full_name(),
            });
        }

        Ok(M::decode(payload)?)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

type RegisterFn = fn(&mut ProtoSerde, u32, Vec<i32>);

struct Pending {
    subject: String,
    index: Vec<i32>,
    register: RegisterFn,
}

/// Resolves schema IDs for a set of message types, then builds a
/// [`ProtoSerde`].
///
/// ```ignore
/// let serde = SerdeBuilder::new(RegistryClient::from_process_env()?)
///     .message::<Reading>()
///     .build()
///     .await?;
/// ```
pub struct SerdeBuilder {
    client: RegistryClient,
    pending: Vec<Pending>,
}

impl SerdeBuilder {
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            pending: Vec::new(),
        }
    }

    /// Add `M`, the first message declared in its schema.
    pub fn message<M>(self) -> Self
    where
        M: Message + Name + 'static,
    {
        self.message_at::<M>(vec![0])
    }

    /// Add `M` at an explicit message-index path within its schema. An empty
    /// path means the first message, `[0]`.
    pub fn message_at<M>(mut self, index: Vec<i32>) -> Self
    where
        M: Message + Name + 'static,
    {
        self.pending.push(Pending {
            subject: M::full_name(),
            index,
            register: ProtoSerde::register::<M>,
        });
        self
    }

    /// Look up the latest schema for every message and register it.
    pub async fn build(self) -> Result<ProtoSerde, SchemaRegistryError> {
        let mut serde = ProtoSerde::new();

        for pending in self.pending {
            let schema = self
                .client
                .schema_by_version(&pending.subject, SchemaVersion::Latest)
                .await?;
            tracing::debug!(
                subject = %pending.subject,
                schema_id = schema.id,
                version = schema.version,
                "Registered message schema"
            );
            (pending.register)(&mut serde, schema.id, pending.index);
        }

        Ok(serde)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, prost::Message)]
    struct Reading {
        #[prost(string, tag = "1")]
        sensor: String,
        #[prost(double, tag = "2")]
        value: f64,
    }

    impl Name for Reading {
        const NAME: &'static str = "Reading";
        const PACKAGE: &'static str = "telemetry.v1";
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct Alert {
        #[prost(string, tag = "1")]
        reason: String,
    }

    impl Name for Alert {
        const NAME: &'static str = "Alert";
        const PACKAGE: &'static str = "telemetry.v1";
    }

    fn reading() -> Reading {
        Reading {
            sensor: "cpu".to_string(),
            value: 0.75,
        }
    }

    #[test]
    fn test_encode_decode() {
        let mut serde = ProtoSerde::new();
        serde.register::<Reading>(5, vec![0]);

        let bytes = serde.encode(&reading()).unwrap();
        assert_eq!(&bytes[..6], &[0, 0, 0, 0, 5, 0]);
        assert_eq!(serde.decode::<Reading>(&bytes).unwrap(), reading());
    }

    #[test]
    fn test_unregistered_type() {
        let serde = ProtoSerde::new();
        let err = serde.encode(&reading()).unwrap_err();
        assert_eq!(err.to_string(), "message type telemetry.v1.Reading is not registered");
    }

    #[test]
    fn test_decode_checks_schema_id_and_type() {
        let mut serde = ProtoSerde::new();
        serde.register::<Reading>(5, vec![0]);
        serde.register::<Alert>(6, vec![1]);

        let alert = serde
            .encode(&Alert {
                reason: "hot".to_string(),
            })
            .unwrap();
        assert!(matches!(
            serde.decode::<Reading>(&alert),
            Err(SerdeError::TypeMismatch { id: 6, .. })
        ));

        let mut other = ProtoSerde::new();
        other.register::<Reading>(99, vec![0]);
        let foreign = other.encode(&reading()).unwrap();
        assert!(matches!(
            serde.decode::<Reading>(&foreign),
            Err(SerdeError::UnknownSchemaId(99))
        ));
    }

    #[test]
    fn test_empty_index_means_first_message() {
        let mut serde = ProtoSerde::new();
        serde.register::<Reading>(5, vec![]);

        assert_eq!(serde.index_of::<Reading>(), Some(&[0][..]));
        let bytes = serde.encode(&reading()).unwrap();
        assert_eq!(&bytes[..6], &[0, 0, 0, 0, 5, 0]);
        assert_eq!(serde.decode::<Reading>(&bytes).unwrap(), reading());
    }

    #[test]
    fn test_reregister_replaces_id() {
        let mut serde = ProtoSerde::new();
        serde.register::<Reading>(5, vec![0]);
        serde.register::<Reading>(8, vec![0]);

        assert_eq!(serde.len(), 1);
        assert_eq!(serde.schema_id_of::<Reading>(), Some(8));
        let bytes = serde.encode(&reading()).unwrap();
        assert_eq!(bytes[4], 8);
    }
}
