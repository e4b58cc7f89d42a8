//! The `error` module defines the error types used across `stanbridge`.
//!
//! There are three layers:
//! - `ClientError` is produced by the external streaming client seam
//!   (`crate::client`), including the loopback server.
//! - `CodecError` is produced by message codecs.
//! - `BrokerError` is what the generic broker API returns. Transport and
//!   codec failures are wrapped as sources, never retried. Use [`report`]
//!   to print an error together with its causes.

use thiserror::Error;

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors raised by a streaming client implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("connect request failed: {0}")]
    ConnectFailed(String),

    #[error("client ID already registered: {0}")]
    ClientIdInUse(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("invalid subject: {0:?}")]
    BadSubject(String),

    #[error("invalid subscription")]
    BadSubscription,

    #[error("publish failed: {0}")]
    Publish(String),
}

/// Errors raised while encoding or decoding a message.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),
}

/// Errors returned by the generic broker API.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// A required setting is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation needs a live connection and `connect` has not succeeded.
    #[error("not connected")]
    NotConnected,

    #[error("connection error")]
    Connect(#[source] ClientError),

    #[error("disconnect error")]
    Disconnect(#[source] ClientError),

    #[error("publish error")]
    Publish(#[source] ClientError),

    #[error("subscribe error")]
    Subscribe(#[source] ClientError),

    #[error("unsubscribe error")]
    Unsubscribe(#[source] ClientError),

    /// Encoding on publish, or decoding on delivery when surfaced.
    #[error("serialization error")]
    Codec(#[from] CodecError),

    #[error("dead-letter store error: {0}")]
    DeadLetter(String),

    /// Returned by a subscriber handler; logged by the delivery callback.
    #[error("handler error: {0}")]
    Handler(String),
}

impl BrokerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a handler error
    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }
}

/// Formats an error followed by its source chain, joined with `": "`.
pub fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl From<sled::Error> for BrokerError {
    fn from(err: sled::Error) -> Self {
        Self::DeadLetter(err.to_string())
    }
}
