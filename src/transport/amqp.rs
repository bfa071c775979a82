//! RabbitMQ binding over `lapin`.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Connection, ConnectionProperties};
use tracing::info;

use crate::pubsub::queue::{DEAD_LETTER_EXCHANGE_ARG, ExchangeKind, QueueHandle, QueueSpec};
use crate::transport::{Channel, Delivery, DeliveryStream, Transport};
use crate::utils::{PubSubError, Result};

const REPLY_SUCCESS: u16 = 200;

/// A shared `lapin` connection.
#[derive(Clone)]
pub struct AmqpTransport {
    connection: Arc<Connection>,
}

impl AmqpTransport {
    pub async fn connect(url: &str) -> Result<Self> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| PubSubError::Connectivity(format!("connect to {url}: {e}")))?;
        info!("Connected to AMQP broker");
        Ok(Self {
            connection: Arc::new(connection),
        })
    }
}

impl std::fmt::Debug for AmqpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpTransport")
            .field("status", &self.connection.status().state())
            .finish()
    }
}

#[async_trait]
impl Transport for AmqpTransport {
    type Channel = AmqpChannel;

    async fn create_channel(&self) -> Result<AmqpChannel> {
        let channel = self.connection.create_channel().await.map_err(classify)?;
        Ok(AmqpChannel { channel })
    }

    async fn close(&self) -> Result<()> {
        if !self.connection.status().connected() {
            return Ok(());
        }
        self.connection
            .close(REPLY_SUCCESS, "bye")
            .await
            .map_err(classify)
    }
}

pub struct AmqpChannel {
    channel: lapin::Channel,
}

impl std::fmt::Debug for AmqpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpChannel")
            .field("id", &self.channel.id())
            .field("status", &self.channel.status().state())
            .finish()
    }
}

#[async_trait]
impl Channel for AmqpChannel {
    type Delivery = AmqpDelivery;

    async fn declare_exchange(&self, name: &str, kind: ExchangeKind, durable: bool) -> Result<()> {
        let kind = match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        };
        self.channel
            .exchange_declare(
                name,
                kind,
                ExchangeDeclareOptions {
                    durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(classify)
    }

    async fn declare_queue(&self, spec: &QueueSpec) -> Result<QueueHandle> {
        let mut arguments = FieldTable::default();
        if let Some(dlx) = &spec.dead_letter_exchange {
            arguments.insert(
                ShortString::from(DEAD_LETTER_EXCHANGE_ARG),
                AMQPValue::LongString(LongString::from(dlx.as_str())),
            );
        }
        let queue = self
            .channel
            .queue_declare(
                &spec.name,
                QueueDeclareOptions {
                    durable: spec.durable,
                    auto_delete: spec.auto_delete,
                    exclusive: spec.exclusive,
                    ..Default::default()
                },
                arguments,
            )
            .await
            .map_err(|e| classify_declare(e, &spec.name))?;
        Ok(QueueHandle {
            name: queue.name().as_str().to_string(),
            message_count: queue.message_count(),
            consumer_count: queue.consumer_count(),
        })
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<()> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(classify)
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<()> {
        // The returned confirm is dropped: this layer never waits for one.
        self.channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type(ShortString::from(content_type)),
            )
            .await
            .map(drop)
            .map_err(classify)
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream<AmqpDelivery>> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(classify)?;

        Ok(consumer
            .map(|res| {
                res.map(|inner| AmqpDelivery { inner })
                    .map_err(classify)
            })
            .boxed())
    }

    async fn close(&self) -> Result<()> {
        if !self.channel.status().connected() {
            return Ok(());
        }
        self.channel
            .close(REPLY_SUCCESS, "closing")
            .await
            .map_err(classify)
    }
}

pub struct AmqpDelivery {
    inner: lapin::message::Delivery,
}

impl std::fmt::Debug for AmqpDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpDelivery")
            .field("delivery_tag", &self.inner.delivery_tag)
            .field("routing_key", &self.inner.routing_key.as_str())
            .field("redelivered", &self.inner.redelivered)
            .finish()
    }
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn payload(&self) -> &[u8] {
        &self.inner.data
    }

    fn routing_key(&self) -> &str {
        self.inner.routing_key.as_str()
    }

    fn redelivered(&self) -> bool {
        self.inner.redelivered
    }

    async fn ack(&self) -> Result<()> {
        self.inner
            .acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(classify)
    }

    async fn nack(&self, requeue: bool) -> Result<()> {
        self.inner
            .acker
            .nack(BasicNackOptions {
                multiple: false,
                requeue,
            })
            .await
            .map_err(classify)
    }
}

/// Maps a `lapin` error onto the crate taxonomy.
pub(crate) fn classify(err: lapin::Error) -> PubSubError {
    match &err {
        lapin::Error::ProtocolError(amqp) => match amqp.kind() {
            AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)
            | AMQPErrorKind::Soft(AMQPSoftError::RESOURCELOCKED) => {
                PubSubError::DeclarationConflict {
                    queue: String::new(),
                    reason: amqp.to_string(),
                }
            }
            AMQPErrorKind::Soft(_) => PubSubError::Rejected(amqp.to_string()),
            AMQPErrorKind::Hard(_) => PubSubError::Connectivity(amqp.to_string()),
        },
        _ => PubSubError::Connectivity(err.to_string()),
    }
}

/// [`classify`] for a failed `queue.declare`, naming the queue in conflicts.
pub(crate) fn classify_declare(err: lapin::Error, queue: &str) -> PubSubError {
    match classify(err) {
        PubSubError::DeclarationConflict { reason, .. } => PubSubError::DeclarationConflict {
            queue: queue.to_string(),
            reason,
        },
        other => other,
    }
}
