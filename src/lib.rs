//! # Peril
//!
//! `peril` is the messaging layer of a multiplayer turn-based game. Game
//! processes talk to each other only through an AMQP broker; this crate gives
//! them typed publishing and subscribing on top of it.
//!
//! ## Core Modules
//!
//! - `pubsub`: queue topology, the typed publisher and the typed subscriber.
//! - `transport`: the broker seam, with a RabbitMQ binding and an in-process one.
//! - `broker`: an in-process AMQP broker used for tests and the `--memory` mode.
//! - `routing`: exchange names, routing keys and game message records.
//! - `client`: the player session and the handlers it subscribes with.
//! - `commands`: the line commands read by the server and client binaries.
//! - `config`: loading settings from files and the environment.
//! - `utils`: the error type and logging setup.

pub mod broker;
pub mod client;
pub mod commands;
pub mod config;
pub mod pubsub;
pub mod routing;
pub mod transport;
pub mod utils;
