//! Name → factory lookup for broker implementations.
//!
//! Tooling that selects a broker by string (a config value, a CLI flag)
//! goes through a `BrokerRegistry` that wiring code fills in explicitly.
//! Factories capture whatever implementation-specific configuration they
//! need, so every entry builds from the same generic `BrokerOptions`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::broker::{Broker, BrokerOptions};
use crate::client::StreamingConnector;
use crate::streaming::{NatsStreamingBroker, StreamingConfig};
use crate::utils::error::{BrokerError, Result};

pub type BrokerFactory = Arc<dyn Fn(BrokerOptions) -> Result<Box<dyn Broker>> + Send + Sync>;

#[derive(Default, Clone)]
pub struct BrokerRegistry {
    factories: BTreeMap<String, BrokerFactory>,
}

impl BrokerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every broker this crate ships.
    pub fn with_defaults(config: StreamingConfig, connector: Arc<dyn StreamingConnector>) -> Self {
        let mut registry = Self::new();
        registry.register(
            NatsStreamingBroker::NAME,
            NatsStreamingBroker::factory(config, connector),
        );
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: BrokerFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            debug!("replaced broker factory {name}");
        }
    }

    pub fn get(&self, name: &str) -> Option<&BrokerFactory> {
        self.factories.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the broker registered under `name`.
    pub fn build(&self, name: &str, options: BrokerOptions) -> Result<Box<dyn Broker>> {
        let factory = self
            .get(name)
            .ok_or_else(|| BrokerError::config(format!("unknown broker {name:?}")))?;
        factory(options)
    }
}

impl std::fmt::Debug for BrokerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerRegistry")
            .field("names", &self.names())
            .finish()
    }
}
