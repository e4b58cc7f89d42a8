use std::time::Duration;

use serde::Deserialize;

use crate::client::{
    ClientOptions, DEFAULT_ACK_WAIT, DEFAULT_CONNECT_WAIT, DEFAULT_DISCOVER_PREFIX,
    DEFAULT_MAX_PUB_ACKS_INFLIGHT, DEFAULT_NATS_URL, DEFAULT_PING_INTERVAL, DEFAULT_PING_MAX_OUT,
};
use crate::streaming::DecodeFailurePolicy;

/// Top-level configuration settings for the application.
///
/// Includes the generic broker selection, the streaming adapter and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub streaming: StreamingSettings,
    pub logging: LoggingSettings,
}

/// Which broker to build and where it should connect.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BrokerSettings {
    /// Registry name of the broker implementation.
    pub name: String,
    pub addrs: Vec<String>,
}

/// Settings for the NATS Streaming adapter.
///
/// `client_id` and `cluster_id` have no defaults; building the broker fails
/// without them.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StreamingSettings {
    pub client_id: Option<String>,
    pub cluster_id: Option<String>,
    pub connect_timeout_ms: u64,
    pub ack_timeout_ms: u64,
    pub discover_prefix: String,
    pub max_pub_acks_inflight: usize,
    pub ping_interval: u32,
    pub ping_max_out: u32,
    pub decode_failure: DecodeFailurePolicy,
    pub dead_letter: DeadLetterSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeadLetterSettings {
    pub path: String,
    pub ttl_secs: Option<i64>,
    pub max_per_topic: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled in
/// from `Settings::default()`.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub streaming: Option<PartialStreamingSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub name: Option<String>,
    pub addrs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialStreamingSettings {
    pub client_id: Option<String>,
    pub cluster_id: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub ack_timeout_ms: Option<u64>,
    pub discover_prefix: Option<String>,
    pub max_pub_acks_inflight: Option<usize>,
    pub ping_interval: Option<u32>,
    pub ping_max_out: Option<u32>,
    pub decode_failure: Option<DecodeFailurePolicy>,
    pub dead_letter: Option<PartialDeadLetterSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDeadLetterSettings {
    pub path: Option<String>,
    pub ttl_secs: Option<i64>,
    pub max_per_topic: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings {
                name: "nats-streaming".to_string(),
                addrs: vec![DEFAULT_NATS_URL.to_string()],
            },
            streaming: StreamingSettings {
                client_id: None,
                cluster_id: None,
                connect_timeout_ms: DEFAULT_CONNECT_WAIT.as_millis() as u64,
                ack_timeout_ms: DEFAULT_ACK_WAIT.as_millis() as u64,
                discover_prefix: DEFAULT_DISCOVER_PREFIX.to_string(),
                max_pub_acks_inflight: DEFAULT_MAX_PUB_ACKS_INFLIGHT,
                ping_interval: DEFAULT_PING_INTERVAL,
                ping_max_out: DEFAULT_PING_MAX_OUT,
                decode_failure: DecodeFailurePolicy::Drop,
                dead_letter: DeadLetterSettings {
                    path: "stanbridge_dead_letters".to_string(),
                    ttl_secs: Some(86_400),
                    max_per_topic: Some(1000),
                },
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Merge a partial configuration over the defaults.
    pub fn merge(partial: PartialSettings) -> Self {
        let default = Self::default();
        let broker = partial.broker.unwrap_or_default();
        let streaming = partial.streaming.unwrap_or_default();
        let dead_letter = streaming.dead_letter.unwrap_or_default();
        let logging = partial.logging.unwrap_or_default();

        Self {
            broker: BrokerSettings {
                name: broker.name.unwrap_or(default.broker.name),
                addrs: broker.addrs.unwrap_or(default.broker.addrs),
            },
            streaming: StreamingSettings {
                client_id: streaming.client_id.or(default.streaming.client_id),
                cluster_id: streaming.cluster_id.or(default.streaming.cluster_id),
                connect_timeout_ms: streaming
                    .connect_timeout_ms
                    .unwrap_or(default.streaming.connect_timeout_ms),
                ack_timeout_ms: streaming
                    .ack_timeout_ms
                    .unwrap_or(default.streaming.ack_timeout_ms),
                discover_prefix: streaming
                    .discover_prefix
                    .unwrap_or(default.streaming.discover_prefix),
                max_pub_acks_inflight: streaming
                    .max_pub_acks_inflight
                    .unwrap_or(default.streaming.max_pub_acks_inflight),
                ping_interval: streaming
                    .ping_interval
                    .unwrap_or(default.streaming.ping_interval),
                ping_max_out: streaming
                    .ping_max_out
                    .unwrap_or(default.streaming.ping_max_out),
                decode_failure: streaming
                    .decode_failure
                    .unwrap_or(default.streaming.decode_failure),
                dead_letter: DeadLetterSettings {
                    path: dead_letter.path.unwrap_or(default.streaming.dead_letter.path),
                    ttl_secs: dead_letter
                        .ttl_secs
                        .or(default.streaming.dead_letter.ttl_secs),
                    max_per_topic: dead_letter
                        .max_per_topic
                        .or(default.streaming.dead_letter.max_per_topic),
                },
            },
            logging: LoggingSettings {
                level: logging.level.unwrap_or(default.logging.level),
            },
        }
    }

    /// Client tunables. `url` is the first configured address; the broker
    /// replaces it with its normalized first address on connect anyway.
    pub fn client_options(&self) -> ClientOptions {
        let s = &self.streaming;
        ClientOptions {
            url: self
                .broker
                .addrs
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_NATS_URL.to_string()),
            connect_timeout: Duration::from_millis(s.connect_timeout_ms),
            ack_timeout: Duration::from_millis(s.ack_timeout_ms),
            discover_prefix: s.discover_prefix.clone(),
            max_pub_acks_inflight: s.max_pub_acks_inflight,
            ping_interval: s.ping_interval,
            ping_max_out: s.ping_max_out,
        }
    }
}
