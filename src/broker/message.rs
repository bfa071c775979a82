//! Messages as the in-process broker stores and delivers them.

/// A published message sitting in a queue.
///
/// `exchange` and `routing_key` are the ones the publisher used; a
/// dead-lettered message keeps its original routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
    /// Milliseconds since the UNIX epoch, set when the broker accepted the publish.
    pub timestamp: i64,
    pub redelivered: bool,
    /// How many times this message has been dead-lettered.
    pub death_count: u32,
}

impl Message {
    pub fn new(
        exchange: &str,
        routing_key: &str,
        content_type: Option<&str>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            content_type: content_type.map(str::to_string),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            redelivered: false,
            death_count: 0,
        }
    }
}

/// A message pushed to a consumer. It stays unacknowledged in the broker
/// until the consumer acks or nacks `delivery_tag`.
#[derive(Debug, Clone)]
pub struct BrokerDelivery {
    pub delivery_tag: u64,
    pub consumer_tag: String,
    pub message: Message,
}
