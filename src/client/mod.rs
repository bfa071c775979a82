//! The `client` module is the player side of the game as the pub/sub layer
//! sees it: a session and the handlers the client subscribes with.

pub mod handlers;
pub mod session;

pub use session::PlayerSession;

#[cfg(test)]
mod tests;
