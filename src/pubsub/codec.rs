//! Codecs turn typed messages into payload bytes and back.
//!
//! The publisher and subscriber are generic over [`Codec`] so the same
//! delivery loop serves every message type. [`JsonCodec`] is the wire format
//! the game speaks; [`BincodeCodec`] is the compact binary one used for game
//! logs.

use serde::{Serialize, de::DeserializeOwned};

use crate::utils::{PubSubError, Result};

/// Encodes and decodes any serde type, and names the content type it produces.
pub trait Codec: Send + Sync + 'static {
    /// Content-type tag attached to every published payload.
    fn content_type(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}

/// A [`Codec`] backed by `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    pub const CONTENT_TYPE: &'static str = "application/json";
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| PubSubError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| PubSubError::Deserialization(e.to_string()))
    }
}

/// A [`Codec`] backed by `bincode`. Not self-describing: both ends must agree
/// on the message type.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl BincodeCodec {
    pub const CONTENT_TYPE: &'static str = "application/octet-stream";
}

impl Codec for BincodeCodec {
    fn content_type(&self) -> &'static str {
        Self::CONTENT_TYPE
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(|e| PubSubError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        bincode::deserialize(data).map_err(|e| PubSubError::Deserialization(e.to_string()))
    }
}
