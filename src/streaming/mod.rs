//! The NATS Streaming adapter: the generic `Broker` contract expressed
//! through the streaming client seam in `crate::client`.

pub mod broker;
pub mod options;

pub use broker::{NatsStreamingBroker, StreamingSubscriber};
pub use options::{DecodeFailurePolicy, ErrorSink, StreamingConfig, normalize_addrs};
