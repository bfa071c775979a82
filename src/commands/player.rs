use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use super::CommandSummary;
use crate::client::PlayerSession;
use crate::pubsub::{BincodeCodec, publish, publish_json};
use crate::routing::{
    ARMY_MOVES_PREFIX, ArmyMove, EXCHANGE_PERIL_TOPIC, GAME_LOG_SLUG, GameLog, RecognitionOfWar,
    WAR_RECOGNITIONS_PREFIX, player_key,
};
use crate::transport::Channel;

pub const PLAYER_HELP: &str =
    "Commands: move <defender> <location> <units>, war <defender>, help, quit";

/// Publishes the player's moves and war declarations until `quit` or end of
/// input. Each move is followed by a game log entry in `bincode`.
pub async fn run_player_commands<C, R>(
    publisher: &C,
    session: &PlayerSession,
    input: R,
) -> io::Result<CommandSummary>
where
    C: Channel,
    R: AsyncBufRead + Unpin,
{
    let username = session.username();
    let mut lines = input.lines();
    let mut summary = CommandSummary::default();

    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["move", defender, location, units] => {
                let Ok(units) = units.parse::<u32>() else {
                    warn!("Units must be a number, got `{}`", units);
                    continue;
                };
                let mv = ArmyMove {
                    attacker: username.to_string(),
                    defender: defender.to_string(),
                    to_location: location.to_string(),
                    units,
                };
                let key = player_key(ARMY_MOVES_PREFIX, username);
                let sent = publish_json(publisher, EXCHANGE_PERIL_TOPIC, &key, &mv).await;
                if !summary.record(sent) {
                    continue;
                }

                let log = GameLog::now(
                    username,
                    format!("{} moved {} units to {}", username, units, location),
                );
                let key = player_key(GAME_LOG_SLUG, username);
                let sent = publish(publisher, &BincodeCodec, EXCHANGE_PERIL_TOPIC, &key, &log).await;
                summary.record(sent);
                info!("Moved {} units to {}", units, location);
            }
            ["war", defender] => {
                let rw = RecognitionOfWar {
                    attacker: username.to_string(),
                    defender: defender.to_string(),
                };
                let key = player_key(WAR_RECOGNITIONS_PREFIX, username);
                let sent = publish_json(publisher, EXCHANGE_PERIL_TOPIC, &key, &rw).await;
                if summary.record(sent) {
                    info!("Declared war on {}", defender);
                }
            }
            ["quit"] => break,
            [] | ["help"] => println!("{PLAYER_HELP}"),
            _ => warn!("Unknown command: {}", line.trim()),
        }
        if session.is_paused() {
            info!("The game is paused");
        }
    }
    Ok(summary)
}
