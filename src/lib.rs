//! # stanbridge
//!
//! `stanbridge` backs a generic publish/subscribe `Broker` abstraction with a
//! NATS Streaming style client. It only translates: connection handling,
//! acknowledgement tracking and redelivery stay with the client.
//!
//! ## Core Modules
//!
//! - `broker`: the generic contract (`Broker`, `Subscriber`, `Publication`,
//!   `Message`) and the name → factory `BrokerRegistry`.
//! - `streaming`: the NATS Streaming adapter implementing `Broker`.
//! - `client`: the external streaming client seam, plus an in-process
//!   `LoopbackServer` implementation.
//! - `codec`: message codecs; JSON by default.
//! - `persistence`: sled-backed store for undecodable inbound payloads.
//! - `config`: loads settings from file and environment.
//! - `utils`: error types and logging setup.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stanbridge::broker::{
//!     Broker, BrokerOptions, Message, Publication, SubscribeOptions, Subscriber,
//! };
//! use stanbridge::client::LoopbackServer;
//! use stanbridge::streaming::{NatsStreamingBroker, StreamingConfig};
//!
//! let server = LoopbackServer::new("test-cluster");
//! let mut broker = NatsStreamingBroker::new(
//!     BrokerOptions::default(),
//!     StreamingConfig::new("c1", "test-cluster"),
//!     Arc::new(server),
//! )
//! .unwrap();
//! broker.connect().unwrap();
//!
//! let sub = broker
//!     .subscribe(
//!         "orders",
//!         Arc::new(|p: &Publication| {
//!             println!("{}: {:?}", p.topic(), p.message().body);
//!             Ok(())
//!         }),
//!         SubscribeOptions::default(),
//!     )
//!     .unwrap();
//! broker.publish("orders", &Message::new(b"hi".to_vec())).unwrap();
//! sub.unsubscribe().unwrap();
//! broker.disconnect().unwrap();
//! ```

pub mod broker;
pub mod client;
pub mod codec;
pub mod config;
pub mod persistence;
pub mod streaming;
pub mod utils;
