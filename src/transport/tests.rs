use std::time::Duration;

use futures_util::StreamExt;

use super::*;
use crate::broker::Broker;
use crate::pubsub::queue::{QueueDurability, QueueSpec};

#[tokio::test]
async fn test_closed_connection_refuses_channels() {
    let broker = Broker::shared();
    let transport = MemoryTransport::connect(&broker).unwrap();
    transport.close().await.unwrap();

    let err = transport.create_channel().await.unwrap_err();
    assert!(err.is_connectivity());
    // Closing twice is harmless.
    transport.close().await.unwrap();
}

#[tokio::test]
async fn test_clones_share_the_connection() {
    let broker = Broker::shared();
    let transport = MemoryTransport::connect(&broker).unwrap();
    let clone = transport.clone();
    clone.close().await.unwrap();

    assert!(transport.create_channel().await.is_err());
}

#[tokio::test]
async fn test_memory_delivery_ack() {
    let broker = Broker::shared();
    let transport = MemoryTransport::connect(&broker).unwrap();
    let channel = transport.create_channel().await.unwrap();
    let spec = QueueSpec::new("jobs", QueueDurability::Durable).with_dead_letter_exchange(None);
    channel.declare_queue(&spec).await.unwrap();

    // The default exchange routes by queue name.
    channel
        .publish("", "jobs", "text/plain", b"one".to_vec())
        .await
        .unwrap();
    let mut stream = channel.consume("jobs", "worker").await.unwrap();

    let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(delivery.payload(), b"one");
    assert_eq!(delivery.routing_key(), "jobs");
    assert!(!delivery.redelivered());
    assert_eq!(broker.lock().unwrap().unacked_count("jobs"), 1);

    delivery.ack().await.unwrap();
    assert_eq!(broker.lock().unwrap().unacked_count("jobs"), 0);
    assert_eq!(broker.lock().unwrap().queue_depth("jobs"), Some(0));
}

#[tokio::test]
async fn test_dropping_channel_requeues_unacked() {
    let broker = Broker::shared();
    let transport = MemoryTransport::connect(&broker).unwrap();
    let setup = transport.create_channel().await.unwrap();
    let spec = QueueSpec::new("jobs", QueueDurability::Durable).with_dead_letter_exchange(None);
    setup.declare_queue(&spec).await.unwrap();
    setup
        .publish("", "jobs", "text/plain", b"one".to_vec())
        .await
        .unwrap();

    let worker = transport.create_channel().await.unwrap();
    let mut stream = worker.consume("jobs", "worker").await.unwrap();
    let delivery = stream.next().await.unwrap().unwrap();
    assert_eq!(broker.lock().unwrap().queue_depth("jobs"), Some(0));

    drop(delivery);
    drop(stream);
    drop(worker);

    let ready = broker.lock().unwrap().ready_messages("jobs");
    assert_eq!(ready.len(), 1);
    assert!(ready[0].redelivered);
}

#[tokio::test]
async fn test_stream_ends_when_channel_closes() {
    let broker = Broker::shared();
    let transport = MemoryTransport::connect(&broker).unwrap();
    let channel = transport.create_channel().await.unwrap();
    let spec = QueueSpec::new("jobs", QueueDurability::Durable).with_dead_letter_exchange(None);
    channel.declare_queue(&spec).await.unwrap();
    let mut stream = channel.consume("jobs", "worker").await.unwrap();

    channel.close().await.unwrap();
    let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .unwrap();
    assert!(next.is_none());
    // Already closed.
    channel.close().await.unwrap();
}
