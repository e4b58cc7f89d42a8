//! The generic publish/subscribe contract.
//!
//! `Broker` is the capability set application code programs against:
//! connect, disconnect, publish, subscribe. Concrete adapters (see
//! `crate::streaming`) map it onto a particular messaging system, and
//! `BrokerRegistry` lets wiring code pick one by name.

pub mod message;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use crate::codec::{Codec, JsonCodec};
use crate::utils::error::Result;

pub use message::Message;
pub use registry::{BrokerFactory, BrokerRegistry};

/// Callback invoked for every delivered message.
///
/// Runs on whatever thread the underlying client delivers on. An `Err` is
/// logged by the adapter; it does not stop the subscription.
pub type Handler = Arc<dyn Fn(&Publication) -> Result<()> + Send + Sync>;

/// Options shared by every broker implementation.
#[derive(Clone)]
pub struct BrokerOptions {
    /// Candidate server addresses, in preference order.
    pub addrs: Vec<String>,
    pub codec: Arc<dyn Codec>,
}

impl Default for BrokerOptions {
    fn default() -> Self {
        Self {
            addrs: Vec::new(),
            codec: Arc::new(JsonCodec),
        }
    }
}

impl BrokerOptions {
    pub fn with_addrs<I, S>(mut self, addrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addrs = addrs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }
}

impl fmt::Debug for BrokerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerOptions")
            .field("addrs", &self.addrs)
            .field("codec", &self.codec.name())
            .finish()
    }
}

/// Per-subscription options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Whether the subscription acknowledges messages on receipt.
    pub auto_ack: bool,
    /// Queue group name. When set, subscribers sharing the name split the
    /// messages between them instead of each receiving all of them.
    pub queue: Option<String>,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            auto_ack: true,
            queue: None,
        }
    }
}

impl SubscribeOptions {
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            queue: Some(name.into()),
            ..Self::default()
        }
    }

    /// The queue group name, treating an empty string as unset.
    pub fn queue_name(&self) -> Option<&str> {
        self.queue.as_deref().filter(|q| !q.is_empty())
    }
}

/// A decoded message as handed to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    topic: String,
    message: Message,
}

impl Publication {
    pub fn new(topic: impl Into<String>, message: Message) -> Self {
        Self {
            topic: topic.into(),
            message,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Always succeeds. Acknowledgement is left to the underlying client.
    pub fn ack(&self) -> Result<()> {
        Ok(())
    }
}

/// A live subscription returned by [`Broker::subscribe`].
pub trait Subscriber: Send + Sync {
    fn options(&self) -> &SubscribeOptions;

    fn topic(&self) -> &str;

    /// Stop delivery for this subscription.
    fn unsubscribe(&self) -> Result<()>;
}

/// The generic broker capability set.
///
/// `connect` and `disconnect` take `&mut self`: a broker must be connected
/// before it is shared for publishing and subscribing.
pub trait Broker: Send + Sync {
    /// Replace the generic options.
    fn init(&mut self, options: BrokerOptions) -> Result<()>;

    fn options(&self) -> &BrokerOptions;

    /// The address the broker connects to, or an empty string.
    fn address(&self) -> String;

    fn connect(&mut self) -> Result<()>;

    fn disconnect(&mut self) -> Result<()>;

    fn publish(&self, topic: &str, msg: &Message) -> Result<()>;

    fn subscribe(
        &self,
        topic: &str,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Box<dyn Subscriber>>;

    /// Registry name of the implementation.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests;
