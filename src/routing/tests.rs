use super::*;
use crate::pubsub::{BincodeCodec, Codec, JsonCodec};
use chrono::TimeZone;
use serde_json::json;

#[test]
fn test_playing_state_wire_format() {
    let bytes = JsonCodec.encode(&PlayingState { is_paused: true }).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value, json!({ "IsPaused": true }));
}

#[test]
fn test_army_move_from_json() {
    let raw = json!({
        "Attacker": "alice",
        "Defender": "bob",
        "ToLocation": "europe",
        "Units": 3
    })
    .to_string();
    let mv: ArmyMove = JsonCodec.decode(raw.as_bytes()).unwrap();
    assert_eq!(mv.attacker, "alice");
    assert_eq!(mv.defender, "bob");
    assert_eq!(mv.units, 3);
}

#[test]
fn test_game_log_round_trip() {
    let log = GameLog {
        current_time: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        message: "alice moved 3 units to europe".to_string(),
        username: "alice".to_string(),
    };
    let bytes = JsonCodec.encode(&log).unwrap();
    let decoded: GameLog = JsonCodec.decode(&bytes).unwrap();
    assert_eq!(decoded, log);
}

#[test]
fn test_game_log_binary_round_trip() {
    let log = GameLog {
        current_time: chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        message: "bob declared war on alice".to_string(),
        username: "bob".to_string(),
    };
    let bytes = BincodeCodec.encode(&log).unwrap();
    assert!(serde_json::from_slice::<serde_json::Value>(&bytes).is_err());

    let decoded: GameLog = BincodeCodec.decode(&bytes).unwrap();
    assert_eq!(decoded, log);
    assert!(BincodeCodec.decode::<GameLog>(&bytes[..bytes.len() / 2]).is_err());
}

#[test]
fn test_routing_keys() {
    assert_eq!(player_key(PAUSE_KEY, "alice"), "pause.alice");
    assert_eq!(any_player(GAME_LOG_SLUG), "game_logs.*");
    assert_eq!(any_player(ARMY_MOVES_PREFIX), "army_moves.*");
}
