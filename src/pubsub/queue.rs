//! Queue declarations.
//!
//! Only two flag combinations are supported and both come from
//! [`QueueDurability`]: a durable queue survives broker restarts and is shared
//! between connections, a transient queue belongs to one connection and goes
//! away with its last consumer.

use crate::routing::DEAD_LETTER_EXCHANGE;
use crate::utils::{PubSubError, Result};

/// AMQP queue argument naming the dead-letter exchange.
pub const DEAD_LETTER_EXCHANGE_ARG: &str = "x-dead-letter-exchange";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueDurability {
    Durable,
    Transient,
}

/// Everything the broker needs to declare a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    pub exclusive: bool,
    pub dead_letter_exchange: Option<String>,
}

impl QueueSpec {
    /// Builds the spec for `mode`, dead-lettering to the well-known exchange.
    pub fn new(name: impl Into<String>, mode: QueueDurability) -> Self {
        let durable = mode == QueueDurability::Durable;
        Self {
            name: name.into(),
            durable,
            auto_delete: !durable,
            exclusive: !durable,
            dead_letter_exchange: Some(DEAD_LETTER_EXCHANGE.to_string()),
        }
    }

    pub fn with_dead_letter_exchange(mut self, exchange: Option<String>) -> Self {
        self.dead_letter_exchange = exchange;
        self
    }

    /// The durability mode these flags encode, if they encode one.
    pub fn durability(&self) -> Option<QueueDurability> {
        match (self.durable, self.auto_delete, self.exclusive) {
            (true, false, false) => Some(QueueDurability::Durable),
            (false, true, true) => Some(QueueDurability::Transient),
            _ => None,
        }
    }

    /// Rejects flag combinations outside the two supported modes.
    pub fn validate(&self) -> Result<QueueDurability> {
        self.durability().ok_or_else(|| {
            PubSubError::InvalidQueueSpec(format!(
                "queue `{}`: durable={} auto_delete={} exclusive={} is not a supported combination",
                self.name, self.durable, self.auto_delete, self.exclusive
            ))
        })
    }
}

/// What the broker reports back after a successful declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
    pub message_count: u32,
    pub consumer_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    Direct,
    Topic,
    Fanout,
}
