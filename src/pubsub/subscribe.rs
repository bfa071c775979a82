//! Typed subscriber
//!
//! `subscribe` declares and binds the queue, starts a manual-ack consumer and
//! spawns one task that drives it. It returns as soon as the consumer is
//! running; messages are processed afterwards, one at a time, in the order
//! the broker delivers them.
//!
//! Every delivery ends in exactly one broker call, chosen by the handler's
//! [`AckDecision`]. A payload that does not decode is settled according to
//! the [`DecodeFailurePolicy`] without reaching the handler.
//!
//! The task owns its channel and closes it on the way out. It stops when:
//! - the delivery stream ends because the channel or connection was closed,
//! - the stream reports an error,
//! - an ack/nack call fails,
//! - a payload does not decode under [`DecodeFailurePolicy::Halt`].

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::ack::AckDecision;
use super::codec::{Codec, JsonCodec};
use super::queue::{QueueDurability, QueueSpec};
use super::topology::declare_and_bind_spec;
use crate::routing::DEAD_LETTER_EXCHANGE;
use crate::transport::{Channel, Delivery, DeliveryStream, Transport};
use crate::utils::Result;

/// What to do with a delivery whose payload cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeFailurePolicy {
    /// Nack without requeue (the message is dead-lettered) and keep consuming.
    #[default]
    Discard,
    /// Stop the subscription. The message stays unacknowledged and the
    /// broker requeues it when the channel closes.
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub mode: QueueDurability,
    pub on_decode_failure: DecodeFailurePolicy,
    pub dead_letter_exchange: Option<String>,
}

impl SubscribeOptions {
    /// `mode`, discard-and-continue on bad payloads, dead-lettering to `peril_dlx`.
    pub fn new(mode: QueueDurability) -> Self {
        Self {
            mode,
            on_decode_failure: DecodeFailurePolicy::default(),
            dead_letter_exchange: Some(DEAD_LETTER_EXCHANGE.to_string()),
        }
    }

    pub fn dead_letter_exchange(mut self, exchange: Option<String>) -> Self {
        self.dead_letter_exchange = exchange;
        self
    }

    pub fn on_decode_failure(mut self, policy: DecodeFailurePolicy) -> Self {
        self.on_decode_failure = policy;
        self
    }
}

/// Why a subscription loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The channel or connection closed.
    StreamClosed,
    /// A payload did not decode under [`DecodeFailurePolicy::Halt`].
    DecodeHalted,
    /// The delivery stream yielded an error.
    StreamFailed,
    /// The broker refused an ack or nack.
    AckFailed,
    /// The task was aborted or the handler panicked.
    Aborted,
}

/// Handle on a running subscription. Dropping it leaves the loop running.
#[derive(Debug)]
pub struct Subscription {
    queue: String,
    consumer_tag: String,
    task: JoinHandle<LoopExit>,
}

impl Subscription {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the loop to stop.
    pub async fn wait(self) -> LoopExit {
        self.task.await.unwrap_or(LoopExit::Aborted)
    }
}

/// Subscribes `handler` to `queue_name`, bound to `exchange` under `routing_key`.
///
/// # Errors
/// Declaration, binding and consumer start-up failures are returned here;
/// any channel opened on the way is closed first. Nothing that happens to
/// individual messages is reported to the caller.
pub async fn subscribe<T, K, M, H>(
    transport: &T,
    codec: K,
    exchange: &str,
    queue_name: &str,
    routing_key: &str,
    options: SubscribeOptions,
    handler: H,
) -> Result<Subscription>
where
    T: Transport,
    K: Codec,
    M: DeserializeOwned + Send + 'static,
    H: Fn(M) -> AckDecision + Send + Sync + 'static,
{
    let spec = QueueSpec::new(queue_name, options.mode)
        .with_dead_letter_exchange(options.dead_letter_exchange);
    let (channel, queue) = match declare_and_bind_spec(transport, exchange, &spec, routing_key).await
    {
        Ok(declared) => declared,
        Err(e) => return Err(e.close_channel().await),
    };

    let consumer_tag = format!("{}-{}", queue.name, Uuid::new_v4());
    let deliveries = match channel.consume(&queue.name, &consumer_tag).await {
        Ok(stream) => stream,
        Err(e) => {
            if let Err(close_err) = channel.close().await {
                debug!("Closing channel after failed consume: {close_err}");
            }
            return Err(e);
        }
    };
    debug!("Consuming {} as {}", queue.name, consumer_tag);

    let task = tokio::spawn(consume_loop(
        channel,
        deliveries,
        codec,
        options.on_decode_failure,
        handler,
        queue.name.clone(),
    ));

    Ok(Subscription {
        queue: queue.name,
        consumer_tag,
        task,
    })
}

/// [`subscribe`] with JSON payloads and the default decode-failure policy.
pub async fn subscribe_json<T, M, H>(
    transport: &T,
    exchange: &str,
    queue_name: &str,
    routing_key: &str,
    mode: QueueDurability,
    handler: H,
) -> Result<Subscription>
where
    T: Transport,
    M: DeserializeOwned + Send + 'static,
    H: Fn(M) -> AckDecision + Send + Sync + 'static,
{
    subscribe(
        transport,
        JsonCodec,
        exchange,
        queue_name,
        routing_key,
        SubscribeOptions::new(mode),
        handler,
    )
    .await
}

async fn consume_loop<C, K, M, H>(
    channel: C,
    mut deliveries: DeliveryStream<C::Delivery>,
    codec: K,
    policy: DecodeFailurePolicy,
    handler: H,
    queue: String,
) -> LoopExit
where
    C: Channel,
    K: Codec,
    M: DeserializeOwned + Send + 'static,
    H: Fn(M) -> AckDecision + Send + Sync + 'static,
{
    let exit = loop {
        let delivery = match deliveries.next().await {
            Some(Ok(delivery)) => delivery,
            Some(Err(e)) => {
                error!("Delivery stream for {queue} failed: {e}");
                break LoopExit::StreamFailed;
            }
            None => {
                debug!("Delivery stream for {queue} closed");
                break LoopExit::StreamClosed;
            }
        };

        let decision = match codec.decode::<M>(delivery.payload()) {
            Ok(message) => handler(message),
            Err(e) => match policy {
                DecodeFailurePolicy::Discard => {
                    warn!(
                        "Discarding undecodable message on {queue} (key {}): {e}",
                        delivery.routing_key()
                    );
                    AckDecision::NackDiscard
                }
                DecodeFailurePolicy::Halt => {
                    error!("Stopping subscription on {queue}: {e}");
                    break LoopExit::DecodeHalted;
                }
            },
        };

        if let Err(e) = settle(&delivery, decision).await {
            error!("Could not settle message on {queue}: {e}");
            break LoopExit::AckFailed;
        }
        debug!(
            "{:?} on {queue} (key {}, redelivered {})",
            decision,
            delivery.routing_key(),
            delivery.redelivered()
        );
    };

    drop(deliveries);
    if let Err(e) = channel.close().await {
        debug!("Closing channel for {queue}: {e}");
    }
    exit
}

/// Turns a decision into its single broker call.
async fn settle<D: Delivery>(delivery: &D, decision: AckDecision) -> Result<()> {
    match decision.nack_requeue() {
        None => delivery.ack().await,
        Some(requeue) => delivery.nack(requeue).await,
    }
}
