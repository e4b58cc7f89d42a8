mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

use crate::broker::BrokerOptions;
use crate::persistence::DeadLetterStore;
use crate::streaming::{DecodeFailurePolicy, StreamingConfig};
use crate::utils::error::Result;

pub use settings::{
    BrokerSettings, DeadLetterSettings, LoggingSettings, Settings, StreamingSettings,
};

/// Prefix of environment overrides, e.g. `STANBRIDGE__STREAMING__CLIENT_ID`.
pub const ENV_PREFIX: &str = "STANBRIDGE";

/// Loads the configuration from `config/default` and environment variables,
/// merged over the default values.
pub fn load_config() -> std::result::Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Like [`load_config`], reading the optional file at `path` (any format
/// the `config` crate recognises by extension).
pub fn load_config_from(path: &str) -> std::result::Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("broker.addrs")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}

impl Settings {
    pub fn broker_options(&self) -> BrokerOptions {
        BrokerOptions::default().with_addrs(self.broker.addrs.iter().cloned())
    }

    /// Adapter configuration. Opens the dead-letter store when the
    /// dead-letter policy is selected.
    pub fn streaming_config(&self) -> Result<StreamingConfig> {
        let s = &self.streaming;
        let mut config = StreamingConfig {
            client_id: s.client_id.clone(),
            cluster_id: s.cluster_id.clone(),
            client_options: Some(self.client_options()),
            decode_failure: s.decode_failure,
            ..StreamingConfig::default()
        };

        if s.decode_failure == DecodeFailurePolicy::DeadLetter {
            let store = DeadLetterStore::open(
                &s.dead_letter.path,
                s.dead_letter.ttl_secs,
                s.dead_letter.max_per_topic,
            )?;
            config = config.with_dead_letters(store);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests;
