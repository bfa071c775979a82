use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One player's view of the running game.
///
/// Cloned into every subscription handler; clones share the paused flag.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    username: String,
    paused: Arc<AtomicBool>,
}

impl PlayerSession {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}
