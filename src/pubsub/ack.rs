//! Acknowledgement decisions returned by subscription handlers.

/// What the subscriber does with a message once the handler has seen it.
///
/// Handlers return exactly one of these per delivery and the subscriber
/// turns it into exactly one broker call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckDecision {
    /// Processed; the broker drops the message.
    Ack,
    /// Not processed now; the broker redelivers it to this or another consumer.
    NackRequeue,
    /// Never processable by this consumer; the broker dead-letters it.
    NackDiscard,
}

impl AckDecision {
    /// `Some(requeue)` for a negative acknowledgement, `None` for `Ack`.
    pub fn nack_requeue(self) -> Option<bool> {
        match self {
            AckDecision::Ack => None,
            AckDecision::NackRequeue => Some(true),
            AckDecision::NackDiscard => Some(false),
        }
    }
}
