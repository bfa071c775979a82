//! Broker-side queue state.
//!
//! Callers must synchronize access (the broker lock) when touching a queue.

use std::collections::VecDeque;

use tokio::sync::mpsc::UnboundedSender;

use super::engine::{ChannelId, ConnectionId};
use super::message::{BrokerDelivery, Message};
use crate::pubsub::queue::{QueueHandle, QueueSpec};

#[derive(Debug)]
pub struct Consumer {
    pub tag: String,
    pub channel: ChannelId,
    pub sender: UnboundedSender<BrokerDelivery>,
}

#[derive(Debug)]
pub struct Queue {
    pub spec: QueueSpec,
    /// Owning connection of an exclusive queue.
    pub owner: Option<ConnectionId>,
    pub ready: VecDeque<Message>,
    pub consumers: Vec<Consumer>,
    /// Round-robin cursor into `consumers`.
    pub next_consumer: usize,
    /// Auto-delete only applies once a queue has had a consumer.
    pub had_consumer: bool,
}

impl Queue {
    pub fn new(spec: QueueSpec, owner: Option<ConnectionId>) -> Self {
        Self {
            spec,
            owner,
            ready: VecDeque::new(),
            consumers: Vec::new(),
            next_consumer: 0,
            had_consumer: false,
        }
    }

    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            name: self.spec.name.clone(),
            message_count: self.ready.len() as u32,
            consumer_count: self.consumers.len() as u32,
        }
    }

    /// Whether `connection` may use this queue.
    pub fn accessible_from(&self, connection: ConnectionId) -> bool {
        self.owner.is_none_or(|owner| owner == connection)
    }

    /// Describes how `spec` differs from the declared queue, if it does.
    pub fn mismatch(&self, spec: &QueueSpec) -> Option<String> {
        let mut diffs = Vec::new();
        if self.spec.durable != spec.durable {
            diffs.push(format!("durable is {} not {}", self.spec.durable, spec.durable));
        }
        if self.spec.auto_delete != spec.auto_delete {
            diffs.push(format!(
                "auto_delete is {} not {}",
                self.spec.auto_delete, spec.auto_delete
            ));
        }
        if self.spec.exclusive != spec.exclusive {
            diffs.push(format!(
                "exclusive is {} not {}",
                self.spec.exclusive, spec.exclusive
            ));
        }
        if self.spec.dead_letter_exchange != spec.dead_letter_exchange {
            diffs.push(format!(
                "x-dead-letter-exchange is {:?} not {:?}",
                self.spec.dead_letter_exchange, spec.dead_letter_exchange
            ));
        }
        (!diffs.is_empty()).then(|| diffs.join(", "))
    }

    /// Removes the consumers of `channel`; returns how many were removed.
    pub fn cancel_channel(&mut self, channel: ChannelId) -> usize {
        let before = self.consumers.len();
        self.consumers.retain(|c| c.channel != channel);
        before - self.consumers.len()
    }

    pub fn should_auto_delete(&self) -> bool {
        self.spec.auto_delete && self.had_consumer && self.consumers.is_empty()
    }
}
