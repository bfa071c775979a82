//! The `commands` module reads the line commands typed into `peril server`
//! and `peril client` and turns them into publishes.
//!
//! A failed publish is logged and counted; the loop keeps reading. Only an
//! input error, `quit` or end of input stops it.

pub mod player;
pub mod server;

use tracing::error;

use crate::utils::Result;

pub use player::run_player_commands;
pub use server::run_server_commands;

/// What a command loop did before it stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommandSummary {
    pub published: usize,
    pub failed: usize,
}

impl CommandSummary {
    fn record(&mut self, sent: Result<()>) -> bool {
        match sent {
            Ok(()) => {
                self.published += 1;
                true
            }
            Err(e) => {
                error!("Failed to publish a message: {}", e);
                self.failed += 1;
                false
            }
        }
    }
}
