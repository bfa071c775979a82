//! The `utils` module holds the pieces shared by every layer of `peril`:
//! the error taxonomy and the tracing setup.

pub mod error;
pub mod logging;

pub use error::{PubSubError, Result};

#[cfg(test)]
mod tests;
