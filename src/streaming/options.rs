//! Adapter-specific configuration.
//!
//! `StreamingConfig` carries what the generic `BrokerOptions` cannot: the
//! client and cluster identifiers the streaming server requires, optional
//! client tunables, and what to do with inbound payloads the codec cannot
//! decode.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::client::{ClientOptions, DEFAULT_NATS_URL};
use crate::persistence::DeadLetterStore;
use crate::utils::error::BrokerError;

const URL_SCHEME: &str = "nats://";

/// Receives decode failures when the policy is [`DecodeFailurePolicy::Surface`].
/// Called with the subject the message arrived on.
pub type ErrorSink = Arc<dyn Fn(&str, BrokerError) + Send + Sync>;

/// What a subscription does with a payload the codec rejects. The handler
/// is never invoked for such a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeFailurePolicy {
    /// Log a warning and discard the message.
    #[default]
    Drop,
    /// Log and hand the error to the configured [`ErrorSink`].
    Surface,
    /// Log and keep the raw payload in the dead-letter store.
    DeadLetter,
}

#[derive(Clone, Default)]
pub struct StreamingConfig {
    /// Required. Must be unique among the cluster's connected clients.
    pub client_id: Option<String>,
    /// Required.
    pub cluster_id: Option<String>,
    /// Full override of the client tunables. `url` is always replaced by
    /// the first broker address.
    pub client_options: Option<ClientOptions>,
    pub decode_failure: DecodeFailurePolicy,
    /// Required by [`DecodeFailurePolicy::DeadLetter`].
    pub dead_letters: Option<DeadLetterStore>,
    pub on_decode_error: Option<ErrorSink>,
}

impl StreamingConfig {
    pub fn new(client_id: impl Into<String>, cluster_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            cluster_id: Some(cluster_id.into()),
            ..Self::default()
        }
    }

    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = Some(options);
        self
    }

    pub fn with_decode_failure(mut self, policy: DecodeFailurePolicy) -> Self {
        self.decode_failure = policy;
        self
    }

    pub fn with_dead_letters(mut self, store: DeadLetterStore) -> Self {
        self.dead_letters = Some(store);
        self
    }

    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.on_decode_error = Some(sink);
        self
    }
}

impl fmt::Debug for StreamingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingConfig")
            .field("client_id", &self.client_id)
            .field("cluster_id", &self.cluster_id)
            .field("client_options", &self.client_options)
            .field("decode_failure", &self.decode_failure)
            .field("dead_letters", &self.dead_letters.is_some())
            .field("on_decode_error", &self.on_decode_error.is_some())
            .finish()
    }
}

/// Normalize candidate server addresses.
///
/// Blank entries are dropped, `nats://` is prepended where missing, and an
/// empty result becomes the single default address. Order is kept.
pub fn normalize_addrs<S: AsRef<str>>(addrs: &[S]) -> Vec<String> {
    let normalized: Vec<String> = addrs
        .iter()
        .map(AsRef::as_ref)
        .filter(|addr| !addr.trim().is_empty())
        .map(|addr| {
            if addr.starts_with(URL_SCHEME) {
                addr.to_string()
            } else {
                format!("{URL_SCHEME}{addr}")
            }
        })
        .collect();

    if normalized.is_empty() {
        vec![DEFAULT_NATS_URL.to_string()]
    } else {
        normalized
    }
}
