//! Binding to the in-process [`Broker`].

use std::sync::MutexGuard;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::broker::engine::{ChannelId, ConnectionId};
use crate::broker::message::BrokerDelivery;
use crate::broker::{Broker, SharedBroker};
use crate::pubsub::queue::{ExchangeKind, QueueHandle, QueueSpec};
use crate::transport::{Channel, Delivery, DeliveryStream, Transport};
use crate::utils::{PubSubError, Result};

fn lock(broker: &SharedBroker) -> Result<MutexGuard<'_, Broker>> {
    broker
        .lock()
        .map_err(|_| PubSubError::Connectivity("in-process broker lock poisoned".to_string()))
}

/// One connection to a shared in-process broker. Clones share the connection.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    broker: SharedBroker,
    connection: ConnectionId,
}

impl MemoryTransport {
    pub fn connect(broker: &SharedBroker) -> Result<Self> {
        let connection = lock(broker)?.open_connection();
        Ok(Self {
            broker: broker.clone(),
            connection,
        })
    }

    pub fn broker(&self) -> &SharedBroker {
        &self.broker
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Channel = MemoryChannel;

    async fn create_channel(&self) -> Result<MemoryChannel> {
        let id = lock(&self.broker)?.open_channel(self.connection)?;
        Ok(MemoryChannel {
            broker: self.broker.clone(),
            id,
        })
    }

    async fn close(&self) -> Result<()> {
        lock(&self.broker)?.close_connection(self.connection);
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryChannel {
    broker: SharedBroker,
    id: ChannelId,
}

impl MemoryChannel {
    pub fn id(&self) -> ChannelId {
        self.id
    }
}

// A dropped channel is a closed channel: its consumers go away and its
// unacknowledged deliveries are requeued.
impl Drop for MemoryChannel {
    fn drop(&mut self) {
        if let Ok(mut broker) = self.broker.lock() {
            broker.close_channel(self.id);
        }
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    type Delivery = MemoryDelivery;

    async fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        lock(&self.broker)?.declare_exchange(self.id, name, kind, durable)
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<QueueHandle> {
        lock(&self.broker)?.declare_queue(self.id, spec)
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<()> {
        lock(&self.broker)?.bind_queue(self.id, queue, exchange, routing_key)
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        lock(&self.broker)?.publish(self.id, exchange, routing_key, Some(content_type), payload)
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream<MemoryDelivery>> {
        let (_, rx) = lock(&self.broker)?.consume(self.id, queue, consumer_tag)?;
        let broker = self.broker.clone();
        let channel = self.id;
        let stream = futures::stream::unfold(rx, move |mut rx| {
            let broker = broker.clone();
            async move {
                let inner = rx.recv().await?;
                let delivery = MemoryDelivery {
                    broker,
                    channel,
                    inner,
                };
                Some((Ok(delivery), rx))
            }
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> Result<()> {
        lock(&self.broker)?.close_channel(self.id);
        Ok(())
    }
}

pub struct MemoryDelivery {
    broker: SharedBroker,
    channel: ChannelId,
    inner: BrokerDelivery,
}

impl MemoryDelivery {
    pub fn delivery_tag(&self) -> u64 {
        self.inner.delivery_tag
    }
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.inner.message.payload
    }

    fn routing_key(&self) -> &str {
        &self.inner.message.routing_key
    }

    fn redelivered(&self) -> bool {
        self.inner.message.redelivered
    }

    async fn ack(&self) -> Result<()> {
        lock(&self.broker)?.ack(self.channel, self.inner.delivery_tag)
    }

    async fn nack(&self, requeue: bool) -> Result<()> {
        lock(&self.broker)?.nack(self.channel, self.inner.delivery_tag, requeue)
    }
}
