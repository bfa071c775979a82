//! The `transport` module is the binding between the pub/sub core and a
//! broker connection.
//!
//! The core only sees the [`Transport`], [`Channel`] and [`Delivery`] traits.
//! Two bindings implement them:
//! - [`AmqpTransport`]: a `lapin` connection to RabbitMQ,
//! - [`MemoryTransport`]: a connection to the in-process [`Broker`](crate::broker::Broker).
//!
//! A transport value is a cheap handle on one shared connection and may be
//! cloned into every publisher and subscriber. Channels are not shared: each
//! one belongs to a single publisher or subscription loop.

pub mod amqp;
pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::pubsub::queue::{ExchangeKind, QueueHandle, QueueSpec};
use crate::utils::Result;

pub use amqp::AmqpTransport;
pub use memory::MemoryTransport;

/// Stream of deliveries for one consumer. It ends when the channel or the
/// connection closes.
pub type DeliveryStream<D> = BoxStream<'static, Result<D>>;

/// A connection to the broker that can open channels.
#[async_trait]
pub trait Transport: Clone + Send + Sync + 'static {
    type Channel: Channel;

    /// Opens a new channel. Fails with a connectivity error once the
    /// connection is closed.
    async fn create_channel(&self) -> Result<Self::Channel>;

    /// Closes the connection and every channel opened on it.
    async fn close(&self) -> Result<()>;
}

/// One AMQP channel.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    type Delivery: Delivery;

    async fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()>;

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<QueueHandle>;

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<()>;

    /// Publishes without waiting for a confirm.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<()>;

    /// Starts a consumer with manual acknowledgement.
    async fn consume(&self, queue: &str, consumer_tag: &str)
    -> Result<DeliveryStream<Self::Delivery>>;

    /// Closes the channel. Closing an already closed channel is not an error.
    async fn close(&self) -> Result<()>;
}

/// A message handed to a consumer, acknowledged at most once.
#[async_trait]
pub trait Delivery: Send + Sync + 'static {
    fn payload(&self) -> &[u8];

    fn routing_key(&self) -> &str;

    fn redelivered(&self) -> bool;

    async fn ack(&self) -> Result<()>;

    async fn nack(&self, requeue: bool) -> Result<()>;
}

#[cfg(test)]
mod amqp_tests;
#[cfg(test)]
mod tests;
