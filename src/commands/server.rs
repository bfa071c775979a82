use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use super::CommandSummary;
use crate::pubsub::publish_json;
use crate::routing::{EXCHANGE_PERIL_DIRECT, PAUSE_KEY, PlayingState};
use crate::transport::Channel;

pub const SERVER_HELP: &str = "Commands: pause, resume, help, quit";

/// Broadcasts `pause`/`resume` to every player until `quit` or end of input.
pub async fn run_server_commands<C, R>(publisher: &C, input: R) -> io::Result<CommandSummary>
where
    C: Channel,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut summary = CommandSummary::default();

    while let Some(line) = lines.next_line().await? {
        let is_paused = match line.trim() {
            "pause" => true,
            "resume" => false,
            "quit" => break,
            "help" | "" => {
                println!("{SERVER_HELP}");
                continue;
            }
            other => {
                warn!("Unknown command: {}", other);
                continue;
            }
        };

        let state = PlayingState { is_paused };
        let sent = publish_json(publisher, EXCHANGE_PERIL_DIRECT, PAUSE_KEY, &state).await;
        if summary.record(sent) {
            info!("Game {}", if is_paused { "paused" } else { "resumed" });
        }
    }
    Ok(summary)
}
