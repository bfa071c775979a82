//! Error types shared by the transport, topology, publisher and subscriber.
//!
//! Handler outcomes are not errors: a handler that wants a message requeued
//! or dead-lettered returns an [`AckDecision`](crate::pubsub::AckDecision).
//! Everything here is a failure of the operation that was attempted and is
//! returned to its immediate caller. Nothing in this crate retries.

/// Errors that can occur while talking to the broker.
#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    /// The connection or channel is closed or could not be opened.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// A queue with this name already exists with different properties,
    /// or it is exclusive to another connection.
    #[error("queue `{queue}` already declared with incompatible properties: {reason}")]
    DeclarationConflict { queue: String, reason: String },

    /// The queue flags do not match one of the two durability modes.
    #[error("invalid queue spec: {0}")]
    InvalidQueueSpec(String),

    /// The value could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The payload could not be decoded into the target type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The broker refused the operation (unknown exchange, unknown delivery tag, ...).
    #[error("rejected by broker: {0}")]
    Rejected(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl PubSubError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, PubSubError::Connectivity(_))
    }
}

pub type Result<T> = std::result::Result<T, PubSubError>;
