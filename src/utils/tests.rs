use super::error::PubSubError;
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("bogus");
}

#[test]
fn test_declaration_conflict_display() {
    let err = PubSubError::DeclarationConflict {
        queue: "game_logs".to_string(),
        reason: "durable differs".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "queue `game_logs` already declared with incompatible properties: durable differs"
    );
}

#[test]
fn test_connectivity_classification() {
    assert!(PubSubError::Connectivity("closed".into()).is_connectivity());
    assert!(!PubSubError::Rejected("no exchange".into()).is_connectivity());
}
