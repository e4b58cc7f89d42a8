//! NATS Streaming broker adapter
//!
//! `NatsStreamingBroker` implements the generic `Broker` trait on top of a
//! `StreamingConnector`. Every operation is a direct forward:
//! - `connect` opens one connection to the first configured address
//! - `publish` encodes with the codec and forwards the bytes
//! - `subscribe` registers a callback that decodes each payload and calls
//!   the handler on the client's delivery thread
//!
//! Usage notes:
//! - `connect`/`disconnect` take `&mut self`, so the broker is connected
//!   before it is shared. No lock is taken anywhere in the adapter.
//! - Only the first address is ever dialled. Extra addresses are accepted
//!   and reported with a warning; there is no failover.
//! - Nothing is retried. Transport errors are returned as they come.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::broker::{
    Broker, BrokerFactory, BrokerOptions, Handler, Message, Publication, SubscribeOptions,
    Subscriber,
};
use crate::client::{
    ClientOptions, MsgHandler, StreamingConnection, StreamingConnector, StreamingMessage,
    StreamingSubscription,
};
use crate::persistence::DeadLetterStore;
use crate::streaming::options::{
    DecodeFailurePolicy, ErrorSink, StreamingConfig, normalize_addrs,
};
use crate::utils::error::{BrokerError, CodecError, Result, report};

enum ConnectionState {
    Disconnected,
    Connected(Box<dyn StreamingConnection>),
}

pub struct NatsStreamingBroker {
    addrs: Vec<String>,
    state: ConnectionState,
    options: BrokerOptions,
    client_options: ClientOptions,
    client_id: String,
    cluster_id: String,
    decode_failure: Arc<DecodeFailureHandler>,
    connector: Arc<dyn StreamingConnector>,
}

impl NatsStreamingBroker {
    /// Registry name.
    pub const NAME: &'static str = "nats-streaming";

    /// Build an unconnected broker.
    ///
    /// Fails with a configuration error when the client ID or cluster ID is
    /// missing or blank, or when the dead-letter policy is selected without
    /// a store.
    pub fn new(
        options: BrokerOptions,
        config: StreamingConfig,
        connector: Arc<dyn StreamingConnector>,
    ) -> Result<Self> {
        let cluster_id = required(config.cluster_id, "cluster ID")?;
        let client_id = required(config.client_id, "client ID")?;

        if config.decode_failure == DecodeFailurePolicy::DeadLetter && config.dead_letters.is_none()
        {
            error!("dead-letter policy selected without a dead-letter store");
            return Err(BrokerError::config(
                "dead-letter policy requires a dead-letter store",
            ));
        }

        Ok(Self {
            addrs: normalize_addrs(&options.addrs),
            state: ConnectionState::Disconnected,
            options,
            client_options: config.client_options.unwrap_or_default(),
            client_id,
            cluster_id,
            decode_failure: Arc::new(DecodeFailureHandler {
                policy: config.decode_failure,
                dead_letters: config.dead_letters,
                sink: config.on_decode_error,
            }),
            connector,
        })
    }

    /// A registry factory building this broker from generic options.
    pub fn factory(config: StreamingConfig, connector: Arc<dyn StreamingConnector>) -> BrokerFactory {
        Arc::new(move |options: BrokerOptions| -> Result<Box<dyn Broker>> {
            let broker = Self::new(options, config.clone(), connector.clone())?;
            Ok(Box::new(broker) as Box<dyn Broker>)
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Normalized addresses.
    pub fn addrs(&self) -> &[String] {
        &self.addrs
    }

    pub fn client_options(&self) -> &ClientOptions {
        &self.client_options
    }

    pub fn decode_failure_policy(&self) -> DecodeFailurePolicy {
        self.decode_failure.policy
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    fn connection(&self) -> Result<&dyn StreamingConnection> {
        match &self.state {
            ConnectionState::Connected(conn) => Ok(conn.as_ref()),
            ConnectionState::Disconnected => Err(BrokerError::NotConnected),
        }
    }
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => {
            error!("{what} not defined");
            Err(BrokerError::config(format!("{what} not defined")))
        }
    }
}

impl Broker for NatsStreamingBroker {
    fn init(&mut self, options: BrokerOptions) -> Result<()> {
        self.addrs = normalize_addrs(&options.addrs);
        self.options = options;
        if self.is_connected() {
            debug!("options replaced on a live connection; addresses apply on next connect");
        }
        Ok(())
    }

    fn options(&self) -> &BrokerOptions {
        &self.options
    }

    fn address(&self) -> String {
        self.addrs.first().cloned().unwrap_or_default()
    }

    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let url = self.address();
        if self.addrs.len() > 1 {
            warn!(
                "{} addresses configured; only {url} is used, the rest are ignored",
                self.addrs.len()
            );
        }

        let options = ClientOptions {
            url: url.clone(),
            ..self.client_options.clone()
        };
        let conn = self
            .connector
            .connect(&self.cluster_id, &self.client_id, &options)
            .map_err(|e| {
                error!("failed to connect to {url}: {e}");
                BrokerError::Connect(e)
            })?;

        info!(
            "connected to {url} as {} (cluster {})",
            self.client_id, self.cluster_id
        );
        self.state = ConnectionState::Connected(conn);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(conn) => match conn.close() {
                Ok(()) => {
                    info!("disconnected {} from {}", self.client_id, self.address());
                    Ok(())
                }
                Err(e) => {
                    // Keep the connection so the caller can retry.
                    self.state = ConnectionState::Connected(conn);
                    Err(BrokerError::Disconnect(e))
                }
            },
            ConnectionState::Disconnected => Err(BrokerError::NotConnected),
        }
    }

    fn publish(&self, topic: &str, msg: &Message) -> Result<()> {
        let conn = self.connection()?;
        let data = self.options.codec.marshal(msg)?;
        conn.publish(topic, &data).map_err(BrokerError::Publish)
    }

    fn subscribe(
        &self,
        topic: &str,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Box<dyn Subscriber>> {
        let conn = self.connection()?;

        let codec = self.options.codec.clone();
        let decode_failure = self.decode_failure.clone();
        let callback: MsgHandler = Arc::new(move |msg: StreamingMessage| {
            let message = match codec.unmarshal(&msg.data) {
                Ok(message) => message,
                Err(err) => {
                    decode_failure.handle(&msg, err);
                    return;
                }
            };
            let publication = Publication::new(msg.subject, message);
            if let Err(e) = handler(&publication) {
                warn!("handler for {} failed: {}", publication.topic(), report(&e));
            }
        });

        let sub = match options.queue_name() {
            Some(queue) => conn.queue_subscribe(topic, queue, callback),
            None => conn.subscribe(topic, callback),
        }
        .map_err(|e| {
            error!("failed to subscribe to {topic}: {e}");
            BrokerError::Subscribe(e)
        })?;

        debug!("subscribed to {topic} (queue: {:?})", options.queue_name());
        Ok(Box::new(StreamingSubscriber {
            sub,
            options,
            topic: topic.to_string(),
        }))
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl fmt::Display for NatsStreamingBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::NAME)
    }
}

impl fmt::Debug for NatsStreamingBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NatsStreamingBroker")
            .field("addrs", &self.addrs)
            .field("connected", &self.is_connected())
            .field("client_id", &self.client_id)
            .field("cluster_id", &self.cluster_id)
            .field("decode_failure", &self.decode_failure.policy)
            .finish()
    }
}

/// Handle returned by [`NatsStreamingBroker::subscribe`].
pub struct StreamingSubscriber {
    sub: Box<dyn StreamingSubscription>,
    options: SubscribeOptions,
    topic: String,
}

impl Subscriber for StreamingSubscriber {
    fn options(&self) -> &SubscribeOptions {
        &self.options
    }

    fn topic(&self) -> &str {
        &self.topic
    }

    fn unsubscribe(&self) -> Result<()> {
        self.sub.unsubscribe().map_err(BrokerError::Unsubscribe)
    }
}

struct DecodeFailureHandler {
    policy: DecodeFailurePolicy,
    dead_letters: Option<DeadLetterStore>,
    sink: Option<ErrorSink>,
}

impl DecodeFailureHandler {
    fn handle(&self, msg: &StreamingMessage, err: CodecError) {
        let subject = msg.subject.as_str();
        match self.policy {
            DecodeFailurePolicy::Drop => {
                warn!(
                    "dropping undecodable message {} on {subject}: {err}",
                    msg.sequence
                );
            }
            DecodeFailurePolicy::Surface => {
                warn!("undecodable message {} on {subject}: {err}", msg.sequence);
                match &self.sink {
                    Some(sink) => sink(subject, BrokerError::Codec(err)),
                    None => error!("no decode error sink configured; message {} lost", msg.sequence),
                }
            }
            DecodeFailurePolicy::DeadLetter => {
                warn!(
                    "dead-lettering undecodable message {} on {subject}: {err}",
                    msg.sequence
                );
                let Some(store) = &self.dead_letters else {
                    error!("no dead-letter store configured; message {} lost", msg.sequence);
                    return;
                };
                if let Err(e) = store.store(subject, &msg.data, &err.to_string()) {
                    error!("failed to dead-letter message {} on {subject}: {e}", msg.sequence);
                }
            }
        }
    }
}
