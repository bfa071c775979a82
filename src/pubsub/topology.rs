//! Queue topology manager
//!
//! Declares queues and binds them to exchanges. Every declaration opens its
//! own channel; the channel is handed back with the queue so the caller owns
//! it from then on, including when declaration fails half way.

use tracing::debug;

use super::queue::{ExchangeKind, QueueDurability, QueueHandle, QueueSpec};
use crate::config::TopologySettings;
use crate::routing::{DEAD_LETTER_EXCHANGE, EXCHANGE_PERIL_DIRECT, EXCHANGE_PERIL_TOPIC};
use crate::transport::{Channel, Transport};
use crate::utils::{PubSubError, Result};

/// A failed declare/bind, carrying the channel it opened (if it got that far).
#[derive(Debug)]
pub struct DeclareError<C> {
    pub channel: Option<C>,
    pub source: PubSubError,
}

impl<C: Channel> DeclareError<C> {
    /// Closes the channel, if any, and returns the underlying error.
    pub async fn close_channel(self) -> PubSubError {
        if let Some(channel) = self.channel {
            if let Err(e) = channel.close().await {
                debug!("Closing channel after failed declaration: {e}");
            }
        }
        self.source
    }
}

impl<C> DeclareError<C> {
    pub fn into_parts(self) -> (Option<C>, PubSubError) {
        (self.channel, self.source)
    }
}

impl<C> std::fmt::Display for DeclareError<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.source.fmt(f)
    }
}

impl<C: std::fmt::Debug> std::error::Error for DeclareError<C> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Declares `queue_name` in `mode`, dead-lettering to `peril_dlx`, and binds
/// it to `exchange` under `routing_key`.
pub async fn declare_and_bind<T: Transport>(
    transport: &T,
    exchange: &str,
    queue_name: &str,
    routing_key: &str,
    mode: QueueDurability,
) -> std::result::Result<(T::Channel, QueueHandle), DeclareError<T::Channel>> {
    let spec = QueueSpec::new(queue_name, mode);
    declare_and_bind_spec(transport, exchange, &spec, routing_key).await
}

/// Like [`declare_and_bind`], for a fully specified queue.
pub async fn declare_and_bind_spec<T: Transport>(
    transport: &T,
    exchange: &str,
    spec: &QueueSpec,
    routing_key: &str,
) -> std::result::Result<(T::Channel, QueueHandle), DeclareError<T::Channel>> {
    if let Err(source) = spec.validate() {
        return Err(DeclareError {
            channel: None,
            source,
        });
    }

    let channel = transport
        .create_channel()
        .await
        .map_err(|source| DeclareError {
            channel: None,
            source,
        })?;

    let queue = match channel.declare_queue(spec).await {
        Ok(queue) => queue,
        Err(source) => {
            return Err(DeclareError {
                channel: Some(channel),
                source,
            });
        }
    };

    if let Err(source) = channel
        .bind_queue(&queue.name, exchange, routing_key)
        .await
    {
        return Err(DeclareError {
            channel: Some(channel),
            source,
        });
    }

    debug!(
        "Queue {} bound to {} with key {}",
        queue.name, exchange, routing_key
    );
    Ok((channel, queue))
}

/// Declares the game exchanges plus the dead-letter exchange (fanout) and
/// the queue that collects everything it receives. When a different
/// dead-letter exchange is configured, `peril_dlx` is declared too and feeds
/// the same queue.
///
/// Safe to run from every process at start-up.
pub async fn setup_topology<C: Channel>(channel: &C, names: &TopologySettings) -> Result<()> {
    channel
        .declare_exchange(EXCHANGE_PERIL_DIRECT, ExchangeKind::Direct, true)
        .await?;
    channel
        .declare_exchange(EXCHANGE_PERIL_TOPIC, ExchangeKind::Topic, true)
        .await?;
    channel
        .declare_exchange(&names.dead_letter_exchange, ExchangeKind::Fanout, true)
        .await?;

    let dlq = QueueSpec::new(names.dead_letter_queue.as_str(), QueueDurability::Durable)
        .with_dead_letter_exchange(None);
    channel.declare_queue(&dlq).await?;
    channel
        .bind_queue(&names.dead_letter_queue, &names.dead_letter_exchange, "")
        .await?;

    // Queues declared without explicit options still point at `peril_dlx`.
    if names.dead_letter_exchange != DEAD_LETTER_EXCHANGE {
        channel
            .declare_exchange(DEAD_LETTER_EXCHANGE, ExchangeKind::Fanout, true)
            .await?;
        channel
            .bind_queue(&names.dead_letter_queue, DEAD_LETTER_EXCHANGE, "")
            .await?;
    }
    debug!("Peril topology declared");
    Ok(())
}
