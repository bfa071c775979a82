mod settings;

use config::{Config, Environment, File};

use crate::utils::Result;
use settings::PartialSettings;

pub use settings::{BrokerSettings, LogSettings, Settings, TopologySettings};

/// Loads `config/default` (any format the `config` crate knows, optional)
/// and `PERIL__SECTION__KEY` environment variables, then fills the gaps
/// from `Settings::default()`.
pub fn load_config() -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::with_prefix("PERIL").separator("__"));

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        broker: BrokerSettings {
            url: partial
                .broker
                .and_then(|b| b.url)
                .unwrap_or(default.broker.url),
        },
        topology: TopologySettings {
            dead_letter_exchange: partial
                .topology
                .as_ref()
                .and_then(|t| t.dead_letter_exchange.clone())
                .unwrap_or(default.topology.dead_letter_exchange),
            dead_letter_queue: partial
                .topology
                .as_ref()
                .and_then(|t| t.dead_letter_queue.clone())
                .unwrap_or(default.topology.dead_letter_queue),
        },
        log: LogSettings {
            level: partial
                .log
                .and_then(|l| l.level)
                .unwrap_or(default.log.level),
        },
    })
}

#[cfg(test)]
mod tests;
