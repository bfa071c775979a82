//! The `pubsub` module is the reusable core: queue topology, the typed
//! publisher and the typed subscriber.
//!
//! Data flows publisher → broker → subscriber stream → decode → handler →
//! ack decision → broker. The module keeps no state of its own; queues and
//! messages live in the broker, channels live in the publisher or
//! subscription that opened them.

pub mod ack;
pub mod codec;
pub mod publish;
pub mod queue;
pub mod subscribe;
pub mod topology;

pub use ack::AckDecision;
pub use codec::{BincodeCodec, Codec, JsonCodec};
pub use publish::{publish, publish_json};
pub use queue::{ExchangeKind, QueueDurability, QueueHandle, QueueSpec};
pub use subscribe::{
    DecodeFailurePolicy, LoopExit, SubscribeOptions, Subscription, subscribe, subscribe_json,
};
pub use topology::{DeclareError, declare_and_bind, declare_and_bind_spec, setup_topology};
