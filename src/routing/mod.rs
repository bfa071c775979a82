//! The `routing` module is the wire contract the game processes share:
//! exchange names, routing keys and the message records sent over them.

pub mod messages;

pub use messages::{ArmyMove, GameLog, PlayingState, RecognitionOfWar};

pub const EXCHANGE_PERIL_DIRECT: &str = "peril_direct";
pub const EXCHANGE_PERIL_TOPIC: &str = "peril_topic";

/// Every queue dead-letters here unless told otherwise.
pub const DEAD_LETTER_EXCHANGE: &str = "peril_dlx";
pub const DEAD_LETTER_QUEUE: &str = "peril_dlq";

pub const PAUSE_KEY: &str = "pause";
pub const ARMY_MOVES_PREFIX: &str = "army_moves";
pub const WAR_RECOGNITIONS_PREFIX: &str = "war";
pub const GAME_LOG_SLUG: &str = "game_logs";

/// `<prefix>.<username>`, the key a player publishes under.
pub fn player_key(prefix: &str, username: &str) -> String {
    format!("{prefix}.{username}")
}

/// `<prefix>.*`, matching every player's key under `prefix`.
pub fn any_player(prefix: &str) -> String {
    format!("{prefix}.*")
}

#[cfg(test)]
mod tests;
