//! Broker engine
//!
//! An in-process model of the AMQP broker the game runs against. It keeps
//! exchanges, queues and bindings, hands deliveries to consumers, and tracks
//! every unacknowledged delivery until it is acked, requeued or dead-lettered.
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind `Arc<Mutex<Broker>>`
//!   ([`SharedBroker`]). The memory transport never holds the lock across an
//!   `.await`.
//! - Deliveries reach consumers over unbounded mpsc channels. Closing a
//!   channel or connection drops the senders, which ends the consumer
//!   streams.
//! - Soft errors close the channel that caused them, as a real broker does.
//!   Later operations on that channel fail with a connectivity error.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, warn};
use uuid::Uuid;

use super::exchange::{Binding, Exchange};
use super::message::{BrokerDelivery, Message};
use super::queue::{Consumer, Queue};
use crate::pubsub::queue::{ExchangeKind, QueueHandle, QueueSpec};
use crate::utils::{PubSubError, Result};

pub type ConnectionId = u64;
pub type ChannelId = u64;

/// A broker shared between every in-process connection.
pub type SharedBroker = Arc<Mutex<Broker>>;

/// The nameless exchange every queue is implicitly bound to by its own name.
pub const DEFAULT_EXCHANGE: &str = "";

#[derive(Debug)]
struct Unacked {
    queue: String,
    channel: ChannelId,
    message: Message,
}

#[derive(Debug)]
pub struct Broker {
    exchanges: HashMap<String, Exchange>,
    queues: HashMap<String, Queue>,
    connections: HashSet<ConnectionId>,
    channels: HashMap<ChannelId, ConnectionId>,
    unacked: HashMap<u64, Unacked>,
    next_id: u64,
    next_delivery_tag: u64,
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        let mut exchanges = HashMap::new();
        exchanges.insert(
            DEFAULT_EXCHANGE.to_string(),
            Exchange::new(DEFAULT_EXCHANGE, ExchangeKind::Direct, true),
        );
        Self {
            exchanges,
            queues: HashMap::new(),
            connections: HashSet::new(),
            channels: HashMap::new(),
            unacked: HashMap::new(),
            next_id: 1,
            next_delivery_tag: 1,
        }
    }

    pub fn shared() -> SharedBroker {
        Arc::new(Mutex::new(Self::new()))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn open_connection(&mut self) -> ConnectionId {
        let id = self.next_id();
        self.connections.insert(id);
        debug!("Opened connection {id}");
        id
    }

    /// Closes every channel of the connection and deletes its exclusive queues.
    pub fn close_connection(&mut self, connection: ConnectionId) {
        if !self.connections.remove(&connection) {
            return;
        }
        let channels: Vec<ChannelId> = self
            .channels
            .iter()
            .filter(|(_, conn)| **conn == connection)
            .map(|(ch, _)| *ch)
            .collect();
        for channel in channels {
            self.close_channel(channel);
        }

        let exclusive: Vec<String> = self
            .queues
            .values()
            .filter(|q| q.owner == Some(connection))
            .map(|q| q.spec.name.clone())
            .collect();
        for queue in exclusive {
            self.delete_queue(&queue);
        }
        debug!("Closed connection {connection}");
    }

    pub fn open_channel(&mut self, connection: ConnectionId) -> Result<ChannelId> {
        if !self.connections.contains(&connection) {
            return Err(PubSubError::Connectivity(format!(
                "connection {connection} is closed"
            )));
        }
        let id = self.next_id();
        self.channels.insert(id, connection);
        Ok(id)
    }

    pub fn is_channel_open(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    /// Cancels the channel's consumers and requeues what it left unacknowledged.
    pub fn close_channel(&mut self, channel: ChannelId) {
        if self.channels.remove(&channel).is_none() {
            return;
        }

        let mut tags: Vec<u64> = self
            .unacked
            .iter()
            .filter(|(_, u)| u.channel == channel)
            .map(|(tag, _)| *tag)
            .collect();
        // Newest first so push_front restores delivery order.
        tags.sort_unstable_by(|a, b| b.cmp(a));
        let mut touched = HashSet::new();
        for tag in tags {
            if let Some(Unacked { queue, mut message, .. }) = self.unacked.remove(&tag) {
                if let Some(q) = self.queues.get_mut(&queue) {
                    message.redelivered = true;
                    q.ready.push_front(message);
                    touched.insert(queue);
                }
            }
        }

        let mut emptied = Vec::new();
        for queue in self.queues.values_mut() {
            if queue.cancel_channel(channel) > 0 && queue.should_auto_delete() {
                emptied.push(queue.spec.name.clone());
            }
        }
        for queue in emptied {
            touched.remove(&queue);
            self.delete_queue(&queue);
        }
        for queue in touched {
            self.dispatch(&queue);
        }
    }

    /// Closes `channel` and hands back `err`, the way a soft AMQP error does.
    fn channel_error(&mut self, channel: ChannelId, err: PubSubError) -> PubSubError {
        warn!("Closing channel {channel}: {err}");
        self.close_channel(channel);
        err
    }

    fn check_channel(&self, channel: ChannelId) -> Result<ConnectionId> {
        self.channels
            .get(&channel)
            .copied()
            .ok_or_else(|| PubSubError::Connectivity(format!("channel {channel} is closed")))
    }

    pub fn declare_exchange(
        &mut self,
        channel: ChannelId,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<()> {
        self.check_channel(channel)?;
        if name == DEFAULT_EXCHANGE || name.starts_with("amq.") {
            let err = PubSubError::Rejected(format!("exchange name `{name}` is reserved"));
            return Err(self.channel_error(channel, err));
        }
        if let Some(existing) = self.exchanges.get(name) {
            if existing.kind != kind || existing.durable != durable {
                let err = PubSubError::Rejected(format!(
                    "exchange `{name}` already declared as {:?} (durable={})",
                    existing.kind, existing.durable
                ));
                return Err(self.channel_error(channel, err));
            }
            return Ok(());
        }
        self.exchanges
            .insert(name.to_string(), Exchange::new(name, kind, durable));
        debug!("Declared {kind:?} exchange {name}");
        Ok(())
    }

    pub fn declare_queue(&mut self, channel: ChannelId, spec: &QueueSpec) -> Result<QueueHandle> {
        let connection = self.check_channel(channel)?;

        let mut spec = spec.clone();
        if spec.name.is_empty() {
            spec.name = format!("amq.gen-{}", Uuid::new_v4());
        } else if spec.name.starts_with("amq.") {
            let err = PubSubError::Rejected(format!("queue name `{}` is reserved", spec.name));
            return Err(self.channel_error(channel, err));
        }

        let existing = self.queues.get(&spec.name).map(|q| {
            if !q.accessible_from(connection) {
                Err("queue is exclusive to another connection".to_string())
            } else {
                q.mismatch(&spec).map_or_else(|| Ok(q.handle()), Err)
            }
        });
        match existing {
            Some(Ok(handle)) => return Ok(handle),
            Some(Err(reason)) => {
                let err = PubSubError::DeclarationConflict {
                    queue: spec.name.clone(),
                    reason,
                };
                return Err(self.channel_error(channel, err));
            }
            None => {}
        }

        let owner = spec.exclusive.then_some(connection);
        let queue = Queue::new(spec, owner);
        let handle = queue.handle();
        debug!(
            "Declared queue {} (durable={}, auto_delete={}, exclusive={})",
            handle.name, queue.spec.durable, queue.spec.auto_delete, queue.spec.exclusive
        );
        self.queues.insert(handle.name.clone(), queue);
        Ok(handle)
    }

    pub fn bind_queue(
        &mut self,
        channel: ChannelId,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<()> {
        let connection = self.check_channel(channel)?;
        if let Err(err) = self.accessible_queue(connection, queue) {
            return Err(self.channel_error(channel, err));
        }
        if exchange == DEFAULT_EXCHANGE {
            let err = PubSubError::Rejected("cannot bind to the default exchange".to_string());
            return Err(self.channel_error(channel, err));
        }
        match self.exchanges.get_mut(exchange) {
            Some(ex) => {
                ex.bind(queue, routing_key);
                debug!("Bound {queue} to {exchange} with key {routing_key}");
                Ok(())
            }
            None => {
                let err = PubSubError::Rejected(format!("no exchange `{exchange}`"));
                Err(self.channel_error(channel, err))
            }
        }
    }

    fn accessible_queue(&self, connection: ConnectionId, queue: &str) -> Result<()> {
        match self.queues.get(queue) {
            Some(q) if q.accessible_from(connection) => Ok(()),
            Some(_) => Err(PubSubError::DeclarationConflict {
                queue: queue.to_string(),
                reason: "queue is exclusive to another connection".to_string(),
            }),
            None => Err(PubSubError::Rejected(format!("no queue `{queue}`"))),
        }
    }

    /// Routes a message. A key that reaches no queue drops the message.
    pub fn publish(
        &mut self,
        channel: ChannelId,
        exchange: &str,
        routing_key: &str,
        content_type: Option<&str>,
        payload: Vec<u8>,
    ) -> Result<()> {
        self.check_channel(channel)?;
        let message = Message::new(exchange, routing_key, content_type, payload);
        match self.route(exchange, routing_key) {
            Some(targets) => {
                if targets.is_empty() {
                    debug!("No queue bound to {exchange} for key {routing_key}; dropped");
                }
                self.enqueue(&targets, message);
                Ok(())
            }
            None => {
                let err = PubSubError::Rejected(format!("no exchange `{exchange}`"));
                Err(self.channel_error(channel, err))
            }
        }
    }

    /// Queues reached through `exchange`, or `None` if it does not exist.
    fn route(&self, exchange: &str, routing_key: &str) -> Option<Vec<String>> {
        if exchange == DEFAULT_EXCHANGE {
            let target = self
                .queues
                .contains_key(routing_key)
                .then(|| routing_key.to_string());
            return Some(target.into_iter().collect());
        }
        self.exchanges.get(exchange).map(|ex| ex.route(routing_key))
    }

    fn enqueue(&mut self, targets: &[String], message: Message) {
        for name in targets {
            if let Some(queue) = self.queues.get_mut(name) {
                queue.ready.push_back(message.clone());
            }
        }
        for name in targets {
            self.dispatch(name);
        }
    }

    /// Registers a manual-ack consumer and returns its tag and delivery feed.
    pub fn consume(
        &mut self,
        channel: ChannelId,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<(String, UnboundedReceiver<BrokerDelivery>)> {
        let connection = self.check_channel(channel)?;
        if let Err(err) = self.accessible_queue(connection, queue) {
            return Err(self.channel_error(channel, err));
        }

        let tag = if consumer_tag.is_empty() {
            format!("ctag-{}", Uuid::new_v4())
        } else {
            consumer_tag.to_string()
        };
        let duplicate = self
            .queues
            .values()
            .flat_map(|q| q.consumers.iter())
            .any(|c| c.channel == channel && c.tag == tag);
        if duplicate {
            let err = PubSubError::Rejected(format!("consumer tag `{tag}` already in use"));
            return Err(self.channel_error(channel, err));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(q) = self.queues.get_mut(queue) {
            q.consumers.push(Consumer {
                tag: tag.clone(),
                channel,
                sender: tx,
            });
            q.had_consumer = true;
        }
        debug!("Consumer {tag} attached to {queue}");
        self.dispatch(queue);
        Ok((tag, rx))
    }

    /// Hands ready messages to consumers round-robin.
    fn dispatch(&mut self, queue_name: &str) {
        let Some(queue) = self.queues.get_mut(queue_name) else {
            return;
        };
        while !queue.consumers.is_empty() {
            let Some(message) = queue.ready.pop_front() else {
                break;
            };
            let idx = queue.next_consumer % queue.consumers.len();
            let consumer = &queue.consumers[idx];
            let channel = consumer.channel;
            let delivery_tag = self.next_delivery_tag;
            let delivery = BrokerDelivery {
                delivery_tag,
                consumer_tag: consumer.tag.clone(),
                message: message.clone(),
            };
            match consumer.sender.send(delivery) {
                Ok(()) => {
                    self.next_delivery_tag += 1;
                    self.unacked.insert(
                        delivery_tag,
                        Unacked {
                            queue: queue_name.to_string(),
                            channel,
                            message,
                        },
                    );
                    queue.next_consumer = idx + 1;
                }
                Err(_) => {
                    // Receiver dropped without a cancel.
                    warn!("Consumer {} on {queue_name} went away", consumer.tag);
                    queue.consumers.remove(idx);
                    queue.ready.push_front(message);
                }
            }
        }
        if queue.should_auto_delete() {
            self.delete_queue(queue_name);
        }
    }

    pub fn ack(&mut self, channel: ChannelId, delivery_tag: u64) -> Result<()> {
        self.take_unacked(channel, delivery_tag).map(|_| ())
    }

    /// Negative acknowledgement: requeue at the head, or dead-letter.
    pub fn nack(&mut self, channel: ChannelId, delivery_tag: u64, requeue: bool) -> Result<()> {
        let Unacked {
            queue, mut message, ..
        } = self.take_unacked(channel, delivery_tag)?;
        if requeue {
            if let Some(q) = self.queues.get_mut(&queue) {
                message.redelivered = true;
                q.ready.push_front(message);
                self.dispatch(&queue);
            }
        } else {
            self.dead_letter(&queue, message);
        }
        Ok(())
    }

    fn take_unacked(&mut self, channel: ChannelId, delivery_tag: u64) -> Result<Unacked> {
        self.check_channel(channel)?;
        let owned = self
            .unacked
            .get(&delivery_tag)
            .is_some_and(|u| u.channel == channel);
        match self.unacked.remove(&delivery_tag) {
            Some(unacked) if owned => Ok(unacked),
            other => {
                if let Some(unacked) = other {
                    self.unacked.insert(delivery_tag, unacked);
                }
                let err = PubSubError::Rejected(format!("unknown delivery tag {delivery_tag}"));
                Err(self.channel_error(channel, err))
            }
        }
    }

    /// Republishes a rejected message through the queue's dead-letter exchange.
    fn dead_letter(&mut self, queue: &str, mut message: Message) {
        let dlx = self
            .queues
            .get(queue)
            .and_then(|q| q.spec.dead_letter_exchange.clone());
        let Some(dlx) = dlx else {
            debug!("Discarded message from {queue} (no dead-letter exchange)");
            return;
        };
        match self.route(&dlx, &message.routing_key) {
            Some(targets) => {
                message.redelivered = false;
                message.death_count += 1;
                debug!("Dead-lettered message from {queue} via {dlx}");
                self.enqueue(&targets, message);
            }
            None => warn!("Dead-letter exchange {dlx} for {queue} does not exist; message lost"),
        }
    }

    fn delete_queue(&mut self, name: &str) {
        if self.queues.remove(name).is_some() {
            for exchange in self.exchanges.values_mut() {
                exchange.unbind_queue(name);
            }
            debug!("Deleted queue {name}");
        }
    }

    /// Simulates a broker restart: every connection drops, transient queues
    /// and exchanges vanish, durable queues keep their messages.
    pub fn restart(&mut self) {
        let connections: Vec<ConnectionId> = self.connections.iter().copied().collect();
        for connection in connections {
            self.close_connection(connection);
        }
        let transient: Vec<String> = self
            .queues
            .values()
            .filter(|q| !q.spec.durable)
            .map(|q| q.spec.name.clone())
            .collect();
        for queue in transient {
            self.delete_queue(&queue);
        }
        self.exchanges.retain(|_, ex| ex.durable);
    }

    /// Number of messages waiting for a consumer.
    pub fn queue_depth(&self, queue: &str) -> Option<usize> {
        self.queues.get(queue).map(|q| q.ready.len())
    }

    /// Number of messages delivered from `queue` and not yet settled.
    pub fn unacked_count(&self, queue: &str) -> usize {
        self.unacked.values().filter(|u| u.queue == queue).count()
    }

    pub fn consumer_count(&self, queue: &str) -> Option<usize> {
        self.queues.get(queue).map(|q| q.consumers.len())
    }

    pub fn queue_spec(&self, queue: &str) -> Option<QueueSpec> {
        self.queues.get(queue).map(|q| q.spec.clone())
    }

    pub fn has_exchange(&self, name: &str) -> bool {
        self.exchanges.contains_key(name)
    }

    /// `(exchange, binding)` pairs that target `queue`.
    pub fn bindings_of(&self, queue: &str) -> Vec<(String, Binding)> {
        let mut found: Vec<(String, Binding)> = self
            .exchanges
            .values()
            .flat_map(|ex| {
                ex.bindings
                    .iter()
                    .filter(|b| b.queue == queue)
                    .map(|b| (ex.name.clone(), b.clone()))
            })
            .collect();
        found.sort_by(|a, b| (&a.0, &a.1.routing_key).cmp(&(&b.0, &b.1.routing_key)));
        found
    }

    /// Copies of the messages waiting in `queue`, head first.
    pub fn ready_messages(&self, queue: &str) -> Vec<Message> {
        self.queues
            .get(queue)
            .map(|q| q.ready.iter().cloned().collect())
            .unwrap_or_default()
    }
}
