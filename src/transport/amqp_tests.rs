use std::io;
use std::sync::Arc;

use lapin::protocol::{AMQPError, AMQPErrorKind, AMQPHardError, AMQPSoftError};
use lapin::types::ShortString;

use crate::pubsub::DeclareError;
use crate::transport::amqp::{AmqpChannel, AmqpDelivery, classify, classify_declare};
use crate::utils::PubSubError;

fn protocol_error(kind: AMQPErrorKind) -> lapin::Error {
    lapin::Error::ProtocolError(AMQPError::new(kind, ShortString::from("x")))
}

#[test]
fn test_precondition_failed_is_declaration_conflict() {
    let err = classify(protocol_error(AMQPErrorKind::Soft(
        AMQPSoftError::PRECONDITIONFAILED,
    )));
    match err {
        PubSubError::DeclarationConflict { reason, .. } => {
            assert!(reason.contains("PRECONDITION"), "{reason}")
        }
        other => panic!("expected DeclarationConflict, got {other:?}"),
    }
}

#[test]
fn test_resource_locked_is_declaration_conflict() {
    let err = classify(protocol_error(AMQPErrorKind::Soft(
        AMQPSoftError::RESOURCELOCKED,
    )));
    assert!(matches!(err, PubSubError::DeclarationConflict { .. }));
}

#[test]
fn test_other_soft_errors_are_rejected() {
    let err = classify(protocol_error(AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND)));
    assert!(matches!(err, PubSubError::Rejected(_)));
    assert!(!err.is_connectivity());
}

#[test]
fn test_hard_errors_are_connectivity() {
    let err = classify(protocol_error(AMQPErrorKind::Hard(
        AMQPHardError::CONNECTIONFORCED,
    )));
    assert!(err.is_connectivity());
}

#[test]
fn test_io_errors_are_connectivity() {
    let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
    let err = classify(lapin::Error::IOError(Arc::new(io_err)));
    assert!(err.is_connectivity());
}

#[test]
fn test_declare_conflict_names_the_queue() {
    let err = classify_declare(
        protocol_error(AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)),
        "game_logs",
    );
    match &err {
        PubSubError::DeclarationConflict { queue, .. } => assert_eq!(queue, "game_logs"),
        other => panic!("expected DeclarationConflict, got {other:?}"),
    }
    assert!(err.to_string().contains("`game_logs`"));

    let err = classify_declare(
        protocol_error(AMQPErrorKind::Soft(AMQPSoftError::ACCESSREFUSED)),
        "game_logs",
    );
    assert!(matches!(err, PubSubError::Rejected(_)));
}

#[test]
fn test_amqp_types_are_debug_and_errors() {
    fn assert_error<E: std::error::Error>() {}
    fn assert_debug<D: std::fmt::Debug>() {}

    assert_error::<DeclareError<AmqpChannel>>();
    assert_debug::<AmqpDelivery>();
}
