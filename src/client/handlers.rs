//! Subscription handlers for the player process.
//!
//! Each function returns a closure for `subscribe`; the closure decides
//! what happens to every message with an [`AckDecision`].

use tracing::info;

use super::session::PlayerSession;
use crate::pubsub::AckDecision;
use crate::routing::{ArmyMove, PlayingState, RecognitionOfWar};

/// Applies the server's pause/resume broadcast.
pub fn handle_pause(session: PlayerSession) -> impl Fn(PlayingState) -> AckDecision + Send + Sync {
    move |state| {
        session.set_paused(state.is_paused);
        if state.is_paused {
            info!("Game paused");
        } else {
            info!("Game resumed");
        }
        AckDecision::Ack
    }
}

/// Judges an army move seen by this player.
///
/// - A player attacking themselves is never valid: discarded.
/// - A move against this player while the game is paused waits: requeued.
/// - Anything else is accepted.
pub fn handle_move(session: PlayerSession) -> impl Fn(ArmyMove) -> AckDecision + Send + Sync {
    move |mv| {
        if mv.attacker == mv.defender {
            return AckDecision::NackDiscard;
        }
        if mv.defender == session.username() && session.is_paused() {
            return AckDecision::NackRequeue;
        }
        if mv.defender == session.username() {
            info!(
                "{} moved {} units to {} against you",
                mv.attacker, mv.units, mv.to_location
            );
        }
        AckDecision::Ack
    }
}

/// Handles a war declaration between two players.
pub fn handle_war(session: PlayerSession) -> impl Fn(RecognitionOfWar) -> AckDecision + Send + Sync {
    move |war| {
        if war.attacker == war.defender {
            return AckDecision::NackDiscard;
        }
        if session.is_paused() {
            return AckDecision::NackRequeue;
        }
        info!("{} declared war on {}", war.attacker, war.defender);
        AckDecision::Ack
    }
}
