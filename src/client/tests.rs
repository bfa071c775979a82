use super::PlayerSession;
use super::handlers::{handle_move, handle_pause, handle_war};
use crate::pubsub::AckDecision;
use crate::routing::{ArmyMove, PlayingState, RecognitionOfWar};

fn army_move(attacker: &str, defender: &str) -> ArmyMove {
    ArmyMove {
        attacker: attacker.to_string(),
        defender: defender.to_string(),
        to_location: "asia".to_string(),
        units: 2,
    }
}

#[test]
fn test_session_new() {
    let session = PlayerSession::new("alice");
    assert_eq!(session.username(), "alice");
    assert!(!session.is_paused());
}

#[test]
fn test_pause_handler_toggles_shared_state() {
    let session = PlayerSession::new("alice");
    let handler = handle_pause(session.clone());

    assert_eq!(handler(PlayingState { is_paused: true }), AckDecision::Ack);
    assert!(session.is_paused());
    assert_eq!(handler(PlayingState { is_paused: false }), AckDecision::Ack);
    assert!(!session.is_paused());
}

#[test]
fn test_move_against_self_is_discarded() {
    let handler = handle_move(PlayerSession::new("alice"));
    assert_eq!(handler(army_move("bob", "bob")), AckDecision::NackDiscard);
}

#[test]
fn test_move_while_paused_is_requeued() {
    let session = PlayerSession::new("alice");
    session.set_paused(true);
    let handler = handle_move(session);

    assert_eq!(handler(army_move("bob", "alice")), AckDecision::NackRequeue);
    // Moves between other players are not held back.
    assert_eq!(handler(army_move("bob", "carol")), AckDecision::Ack);
}

#[test]
fn test_move_accepted() {
    let handler = handle_move(PlayerSession::new("alice"));
    assert_eq!(handler(army_move("bob", "alice")), AckDecision::Ack);
}

#[test]
fn test_war_handler() {
    let session = PlayerSession::new("alice");
    let handler = handle_war(session.clone());
    let war = |a: &str, d: &str| RecognitionOfWar {
        attacker: a.to_string(),
        defender: d.to_string(),
    };

    assert_eq!(handler(war("bob", "bob")), AckDecision::NackDiscard);
    assert_eq!(handler(war("bob", "alice")), AckDecision::Ack);
    session.set_paused(true);
    assert_eq!(handler(war("bob", "alice")), AckDecision::NackRequeue);
}
