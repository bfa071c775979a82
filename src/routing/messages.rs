//! Message records. Field names follow the JSON the other game processes
//! already speak, hence the PascalCase renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sent by the server on `peril_direct`/`pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    #[serde(rename = "IsPaused")]
    pub is_paused: bool,
}

/// A player moving units towards another player's territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArmyMove {
    pub attacker: String,
    pub defender: String,
    pub to_location: String,
    pub units: u32,
}

/// Raised when two players' armies meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecognitionOfWar {
    pub attacker: String,
    pub defender: String,
}

/// A line for the server's durable game log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameLog {
    pub current_time: DateTime<Utc>,
    pub message: String,
    pub username: String,
}

impl GameLog {
    pub fn now(username: &str, message: impl Into<String>) -> Self {
        Self {
            current_time: Utc::now(),
            message: message.into(),
            username: username.to_string(),
        }
    }
}
