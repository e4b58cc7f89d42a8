//! The external streaming client seam.
//!
//! The adapter in `crate::streaming` never talks to a network itself; it
//! drives an implementation of these traits. A connector opens
//! connections, a connection publishes and registers subscriptions, and a
//! subscription can be torn down. Everything behind them (acknowledgement
//! tracking, redelivery, reconnection) belongs to the implementation.
//!
//! `LoopbackServer` is an in-process implementation, useful for embedding
//! and for tests.

pub mod loopback;

use std::sync::Arc;
use std::time::Duration;

use crate::utils::error::ClientError;

pub use loopback::LoopbackServer;

pub const DEFAULT_NATS_URL: &str = "nats://127.0.0.1:4222";
pub const DEFAULT_CONNECT_WAIT: Duration = Duration::from_secs(2);
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);
pub const DEFAULT_DISCOVER_PREFIX: &str = "_STAN.discover";
pub const DEFAULT_MAX_PUB_ACKS_INFLIGHT: usize = 16384;
/// Seconds between client pings.
pub const DEFAULT_PING_INTERVAL: u32 = 5;
pub const DEFAULT_PING_MAX_OUT: u32 = 3;

/// Tunables handed to the client on connect. The adapter passes them
/// through untouched apart from `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub url: String,
    pub connect_timeout: Duration,
    pub ack_timeout: Duration,
    pub discover_prefix: String,
    pub max_pub_acks_inflight: usize,
    pub ping_interval: u32,
    pub ping_max_out: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_NATS_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_WAIT,
            ack_timeout: DEFAULT_ACK_WAIT,
            discover_prefix: DEFAULT_DISCOVER_PREFIX.to_string(),
            max_pub_acks_inflight: DEFAULT_MAX_PUB_ACKS_INFLIGHT,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_max_out: DEFAULT_PING_MAX_OUT,
        }
    }
}

/// A raw message as delivered by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingMessage {
    pub subject: String,
    pub data: Vec<u8>,
    /// Per-subject sequence number assigned by the server.
    pub sequence: u64,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
    pub redelivered: bool,
}

/// Delivery callback registered with the client.
pub type MsgHandler = Arc<dyn Fn(StreamingMessage) + Send + Sync>;

pub trait StreamingConnector: Send + Sync {
    /// Open a connection to the cluster. Blocks until the handshake
    /// completes or fails.
    fn connect(
        &self,
        cluster_id: &str,
        client_id: &str,
        options: &ClientOptions,
    ) -> Result<Box<dyn StreamingConnection>, ClientError>;
}

pub trait StreamingConnection: Send + Sync {
    /// Publish `data` on `subject`. Blocks until the server acknowledges.
    fn publish(&self, subject: &str, data: &[u8]) -> Result<(), ClientError>;

    fn subscribe(
        &self,
        subject: &str,
        handler: MsgHandler,
    ) -> Result<Box<dyn StreamingSubscription>, ClientError>;

    fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
        handler: MsgHandler,
    ) -> Result<Box<dyn StreamingSubscription>, ClientError>;

    fn close(&self) -> Result<(), ClientError>;
}

pub trait StreamingSubscription: Send + Sync {
    fn unsubscribe(&self) -> Result<(), ClientError>;
}
