//! In-process streaming server
//!
//! `LoopbackServer` implements the client traits without a network. It
//! behaves like a single-node streaming server for one cluster:
//! - connecting requires the server's cluster ID, a `nats://` URL and a
//!   client ID not already connected
//! - each subject keeps a sequence counter; every publish gets the next one
//! - a publish is delivered synchronously, on the publishing thread, to
//!   every plain subscriber and to one member of each queue group (members
//!   take turns)
//!
//! Nothing is stored: a message published while nobody is subscribed is
//! only counted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use crate::client::{
    ClientOptions, MsgHandler, StreamingConnection, StreamingConnector, StreamingMessage,
    StreamingSubscription,
};
use crate::utils::error::ClientError;

#[derive(Default)]
struct ServerState {
    shut_down: bool,
    clients: HashSet<String>,
    channels: HashMap<String, Channel>,
    next_sub_id: u64,
    connects: u64,
}

#[derive(Default)]
struct Channel {
    last_sequence: u64,
    subs: Vec<SubEntry>,
    queue_cursors: HashMap<String, usize>,
}

struct SubEntry {
    id: u64,
    client_id: String,
    queue: Option<String>,
    handler: MsgHandler,
}

impl Channel {
    /// Handlers that should receive the next message.
    fn targets(&mut self) -> Vec<MsgHandler> {
        let mut targets = Vec::new();
        let mut groups: HashMap<&str, Vec<&SubEntry>> = HashMap::new();

        for sub in &self.subs {
            match sub.queue.as_deref() {
                Some(queue) => groups.entry(queue).or_default().push(sub),
                None => targets.push(sub.handler.clone()),
            }
        }

        for (queue, members) in groups {
            let cursor = self.queue_cursors.entry(queue.to_string()).or_insert(0);
            let chosen = members[*cursor % members.len()];
            *cursor = cursor.wrapping_add(1);
            targets.push(chosen.handler.clone());
        }

        targets
    }
}

/// A single-cluster streaming server living in this process.
#[derive(Clone)]
pub struct LoopbackServer {
    cluster_id: String,
    state: Arc<Mutex<ServerState>>,
}

fn lock(state: &Mutex<ServerState>) -> MutexGuard<'_, ServerState> {
    // Handlers never run under the lock, so a poisoned guard still holds
    // consistent state.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LoopbackServer {
    pub fn new(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            state: Arc::new(Mutex::new(ServerState::default())),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    /// Stop accepting connections and fail every later publish.
    pub fn shutdown(&self) {
        let mut state = lock(&self.state);
        state.shut_down = true;
        info!("loopback server for cluster {} shut down", self.cluster_id);
    }

    /// Successful connects since the server was created.
    pub fn connect_count(&self) -> u64 {
        lock(&self.state).connects
    }

    pub fn client_count(&self) -> usize {
        lock(&self.state).clients.len()
    }

    pub fn subscription_count(&self, subject: &str) -> usize {
        lock(&self.state)
            .channels
            .get(subject)
            .map_or(0, |c| c.subs.len())
    }

    /// Sequence number of the last message published on `subject`.
    pub fn last_sequence(&self, subject: &str) -> u64 {
        lock(&self.state)
            .channels
            .get(subject)
            .map_or(0, |c| c.last_sequence)
    }
}

impl StreamingConnector for LoopbackServer {
    fn connect(
        &self,
        cluster_id: &str,
        client_id: &str,
        options: &ClientOptions,
    ) -> Result<Box<dyn StreamingConnection>, ClientError> {
        if !options.url.starts_with("nats://") {
            return Err(ClientError::ConnectFailed(format!(
                "unsupported url {}",
                options.url
            )));
        }
        if client_id.is_empty() {
            return Err(ClientError::ConnectFailed("empty client ID".to_string()));
        }

        let mut state = lock(&self.state);
        if state.shut_down {
            return Err(ClientError::ConnectFailed(format!(
                "no server available at {}",
                options.url
            )));
        }
        // A real server never answers for a cluster it does not own.
        if cluster_id != self.cluster_id {
            return Err(ClientError::ConnectFailed(
                "connect request timeout".to_string(),
            ));
        }
        if !state.clients.insert(client_id.to_string()) {
            return Err(ClientError::ClientIdInUse(client_id.to_string()));
        }
        state.connects += 1;
        debug!("client {client_id} connected to cluster {cluster_id}");

        Ok(Box::new(LoopbackConnection {
            client_id: client_id.to_string(),
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct LoopbackConnection {
    client_id: String,
    state: Arc<Mutex<ServerState>>,
    closed: AtomicBool,
}

impl LoopbackConnection {
    fn register(
        &self,
        subject: &str,
        queue: Option<&str>,
        handler: MsgHandler,
    ) -> Result<Box<dyn StreamingSubscription>, ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectionClosed);
        }
        if subject.is_empty() {
            return Err(ClientError::BadSubject(subject.to_string()));
        }

        let mut state = lock(&self.state);
        if state.shut_down {
            return Err(ClientError::ConnectionClosed);
        }
        state.next_sub_id += 1;
        let id = state.next_sub_id;
        state
            .channels
            .entry(subject.to_string())
            .or_default()
            .subs
            .push(SubEntry {
                id,
                client_id: self.client_id.clone(),
                queue: queue.map(str::to_string),
                handler,
            });

        Ok(Box::new(LoopbackSubscription {
            id,
            subject: subject.to_string(),
            state: self.state.clone(),
            active: AtomicBool::new(true),
        }))
    }
}

impl StreamingConnection for LoopbackConnection {
    fn publish(&self, subject: &str, data: &[u8]) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::ConnectionClosed);
        }
        if subject.is_empty() {
            return Err(ClientError::BadSubject(subject.to_string()));
        }

        let (msg, targets) = {
            let mut state = lock(&self.state);
            if state.shut_down {
                return Err(ClientError::Publish("server shut down".to_string()));
            }
            let channel = state.channels.entry(subject.to_string()).or_default();
            channel.last_sequence += 1;
            let msg = StreamingMessage {
                subject: subject.to_string(),
                data: data.to_vec(),
                sequence: channel.last_sequence,
                timestamp: Utc::now().timestamp_millis(),
                redelivered: false,
            };
            (msg, channel.targets())
        };

        for handler in targets {
            handler(msg.clone());
        }
        Ok(())
    }

    fn subscribe(
        &self,
        subject: &str,
        handler: MsgHandler,
    ) -> Result<Box<dyn StreamingSubscription>, ClientError> {
        self.register(subject, None, handler)
    }

    fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
        handler: MsgHandler,
    ) -> Result<Box<dyn StreamingSubscription>, ClientError> {
        self.register(subject, Some(queue), handler)
    }

    fn close(&self) -> Result<(), ClientError> {
        if self.release() {
            debug!("client {} closed", self.client_id);
            Ok(())
        } else {
            Err(ClientError::ConnectionClosed)
        }
    }
}

impl LoopbackConnection {
    /// Frees the client ID and drops the client's subscriptions. Returns
    /// false when the connection was already released.
    fn release(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let mut state = lock(&self.state);
        state.clients.remove(&self.client_id);
        for channel in state.channels.values_mut() {
            channel.subs.retain(|s| s.client_id != self.client_id);
        }
        true
    }
}

impl Drop for LoopbackConnection {
    fn drop(&mut self) {
        if self.release() {
            debug!("client {} dropped without close", self.client_id);
        }
    }
}

struct LoopbackSubscription {
    id: u64,
    subject: String,
    state: Arc<Mutex<ServerState>>,
    active: AtomicBool,
}

impl StreamingSubscription for LoopbackSubscription {
    fn unsubscribe(&self) -> Result<(), ClientError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Err(ClientError::BadSubscription);
        }
        let mut state = lock(&self.state);
        let channel = state
            .channels
            .get_mut(&self.subject)
            .ok_or(ClientError::BadSubscription)?;
        let before = channel.subs.len();
        channel.subs.retain(|s| s.id != self.id);
        // Already dropped by a close of the owning connection.
        if channel.subs.len() == before {
            return Err(ClientError::BadSubscription);
        }
        Ok(())
    }
}
