//! Typed publisher.

use serde::Serialize;

use super::codec::{Codec, JsonCodec};
use crate::transport::Channel;
use crate::utils::Result;

/// Encodes `message` with `codec` and publishes it. Nothing reaches the
/// broker if encoding fails. No confirm is awaited and nothing is retried.
pub async fn publish<C, K, T>(
    channel: &C,
    codec: &K,
    exchange: &str,
    routing_key: &str,
    message: &T,
) -> Result<()>
where
    C: Channel,
    K: Codec,
    T: Serialize + ?Sized,
{
    let payload = codec.encode(message)?;
    channel
        .publish(exchange, routing_key, codec.content_type(), payload)
        .await
}

/// Publishes `message` as `application/json`.
pub async fn publish_json<C, T>(
    channel: &C,
    exchange: &str,
    routing_key: &str,
    message: &T,
) -> Result<()>
where
    C: Channel,
    T: Serialize + ?Sized,
{
    publish(channel, &JsonCodec, exchange, routing_key, message).await
}
