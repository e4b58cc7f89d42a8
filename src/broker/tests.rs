use super::{Broker, BrokerOptions, BrokerRegistry, Message, Publication, SubscribeOptions};
use crate::client::LoopbackServer;
use crate::streaming::{NatsStreamingBroker, StreamingConfig};
use crate::utils::error::BrokerError;
use std::sync::Arc;

fn default_registry() -> BrokerRegistry {
    BrokerRegistry::with_defaults(
        StreamingConfig::new("c1", "test-cluster"),
        Arc::new(LoopbackServer::new("test-cluster")),
    )
}

#[test]
fn test_message_new() {
    let msg = Message::new(b"hello".to_vec()).with_header("id", "42");
    assert_eq!(msg.body, b"hello");
    assert_eq!(msg.header.get("id").map(String::as_str), Some("42"));
}

#[test]
fn test_publication_accessors_and_ack() {
    let publication = Publication::new("orders", Message::new(b"hi".to_vec()));
    assert_eq!(publication.topic(), "orders");
    assert_eq!(publication.message().body, b"hi");
    assert!(publication.ack().is_ok());
}

#[test]
fn test_subscribe_options_default_auto_ack() {
    let opts = SubscribeOptions::default();
    assert!(opts.auto_ack);
    assert_eq!(opts.queue, None);
    assert_eq!(opts.queue_name(), None);
}

#[test]
fn test_subscribe_options_queue_name_ignores_empty() {
    assert_eq!(SubscribeOptions::queue("workers").queue_name(), Some("workers"));
    assert_eq!(SubscribeOptions::queue("").queue_name(), None);
}

#[test]
fn test_broker_options_default_codec() {
    let opts = BrokerOptions::default().with_addrs(["a:1"]);
    assert_eq!(opts.addrs, vec!["a:1".to_string()]);
    assert_eq!(opts.codec.name(), "json");
    assert!(format!("{opts:?}").contains("json"));
}

#[test]
fn test_registry_with_defaults_registers_nats_streaming() {
    let registry = default_registry();
    assert!(registry.contains("nats-streaming"));
    assert_eq!(registry.names(), vec!["nats-streaming"]);
}

#[test]
fn test_registry_build_by_name() {
    let registry = default_registry();
    let mut broker = registry
        .build("nats-streaming", BrokerOptions::default().with_addrs(["127.0.0.1:4222"]))
        .unwrap();

    assert_eq!(broker.name(), "nats-streaming");
    assert_eq!(broker.address(), "nats://127.0.0.1:4222");
    broker.connect().unwrap();
    broker.publish("orders", &Message::new(b"hi".to_vec())).unwrap();
    broker.disconnect().unwrap();
}

#[test]
fn test_registry_unknown_name() {
    let registry = default_registry();
    let err = registry
        .build("kafka", BrokerOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, BrokerError::Config(_)));
}

#[test]
fn test_registry_factory_propagates_config_error() {
    let mut registry = BrokerRegistry::new();
    registry.register(
        NatsStreamingBroker::NAME,
        NatsStreamingBroker::factory(
            StreamingConfig::default(),
            Arc::new(LoopbackServer::new("test-cluster")),
        ),
    );

    let err = registry
        .build("nats-streaming", BrokerOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, BrokerError::Config(_)));
}

#[test]
fn test_registry_register_replaces() {
    let mut registry = default_registry();
    registry.register(
        "nats-streaming",
        NatsStreamingBroker::factory(
            StreamingConfig::new("c2", "other"),
            Arc::new(LoopbackServer::new("other")),
        ),
    );
    assert_eq!(registry.names().len(), 1);
    assert!(registry.get("nats-streaming").is_some());
}
