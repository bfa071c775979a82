//! The `broker` module is an in-process AMQP broker.
//!
//! It stands in for RabbitMQ behind [`MemoryTransport`](crate::transport::MemoryTransport)
//! so the pub/sub layer can run, and be tested, without a server. It models
//! the parts of AMQP the game depends on: direct, topic and fanout exchanges,
//! durable and exclusive queues, manual acknowledgements, requeueing and
//! dead-lettering.

pub mod engine;
pub mod exchange;
pub mod message;
pub mod queue;

pub use engine::{Broker, SharedBroker};
