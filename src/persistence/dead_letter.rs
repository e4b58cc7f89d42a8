//! Dead-letter store backed by `sled`
//!
//! Inbound payloads the codec cannot decode are kept here when a
//! subscription runs with the dead-letter policy. Each topic gets its own
//! `sled` tree and each key is prefixed with a millisecond timestamp, so
//! iteration yields letters in arrival order and TTL cleanup can work from
//! the key alone.
//!
//! Options:
//! - `ttl_seconds`: letters older than this are removed on load
//! - `max_letters_per_topic`: when exceeded the oldest letters are removed

use base64::prelude::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use tracing::warn;
use uuid::Uuid;

use crate::utils::error::{BrokerError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub topic: String,
    /// The undecodable payload, base64 encoded.
    pub payload: String,
    pub reason: String,
    pub timestamp: i64,
}

impl DeadLetter {
    /// The raw payload bytes. Fails when the stored payload is not valid
    /// base64.
    pub fn raw(&self) -> Result<Vec<u8>> {
        BASE64_STANDARD.decode(&self.payload).map_err(|e| {
            BrokerError::DeadLetter(format!("corrupt payload on '{}': {e}", self.topic))
        })
    }
}

#[derive(Clone)]
pub struct DeadLetterStore {
    db: Db,
    ttl_seconds: Option<i64>,
    max_letters_per_topic: Option<usize>,
}

impl DeadLetterStore {
    /// Open or create a sled database at `path` with the given policy.
    /// A negative TTL is a configuration error.
    pub fn open(
        path: &str,
        ttl_seconds: Option<i64>,
        max_letters_per_topic: Option<usize>,
    ) -> Result<Self> {
        if let Some(ttl) = ttl_seconds.filter(|ttl| *ttl < 0) {
            return Err(BrokerError::config(format!(
                "dead-letter TTL must not be negative, got {ttl}"
            )));
        }
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_seconds,
            max_letters_per_topic,
        })
    }

    /// Append an undecodable payload to the topic's tree.
    pub fn store(&self, topic: &str, payload: &[u8], reason: &str) -> Result<()> {
        let letter = DeadLetter {
            topic: topic.to_string(),
            payload: BASE64_STANDARD.encode(payload),
            reason: reason.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        let serialized =
            serde_json::to_vec(&letter).map_err(|e| BrokerError::DeadLetter(e.to_string()))?;
        let tree = self.db.open_tree(topic)?;
        let key = format!("{:020}_{}", letter.timestamp, Uuid::new_v4());
        tree.insert(key.as_bytes(), serialized)?;

        if let Some(max) = self.max_letters_per_topic {
            let total = tree.len();
            if total > max {
                let excess = total - max;
                let keys_to_delete: Vec<_> = tree
                    .iter()
                    .take(excess)
                    .filter_map(|entry| entry.ok().map(|(k, _)| k))
                    .collect();

                for key in keys_to_delete {
                    if let Err(e) = tree.remove(key) {
                        warn!("failed to trim dead letters for '{topic}': {e}");
                    }
                }
            }
        }
        Ok(())
    }

    /// Letters for a topic, oldest first, after TTL cleanup.
    pub fn load(&self, topic: &str) -> Result<Vec<DeadLetter>> {
        self.cleanup_expired(topic)?;
        let tree = self.db.open_tree(topic)?;

        Ok(tree
            .iter()
            .filter_map(|res| res.ok())
            .filter_map(|(_, val)| serde_json::from_slice(&val).ok())
            .collect())
    }

    pub fn len(&self, topic: &str) -> Result<usize> {
        Ok(self.db.open_tree(topic)?.len())
    }

    pub fn is_empty(&self, topic: &str) -> Result<bool> {
        Ok(self.len(topic)? == 0)
    }

    fn cleanup_expired(&self, topic: &str) -> Result<()> {
        let Some(ttl) = self.ttl_seconds else {
            return Ok(());
        };
        // A TTL reaching past the epoch expires nothing.
        let Some(expiry_time) = ttl
            .checked_mul(1000)
            .and_then(|ttl_ms| Utc::now().timestamp_millis().checked_sub(ttl_ms))
        else {
            return Ok(());
        };

        let tree = self.db.open_tree(topic)?;
        let old_keys: Vec<_> = tree
            .iter()
            .filter_map(|res| res.ok())
            .filter_map(|(key_bytes, _)| {
                let key_str = std::str::from_utf8(&key_bytes).ok()?;
                let (ts_str, _) = key_str.split_once('_')?;
                let ts = ts_str.parse::<i64>().ok()?;
                (ts < expiry_time).then_some(key_bytes)
            })
            .collect();

        for key in old_keys {
            tree.remove(key)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeadLetterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadLetterStore")
            .field("db", &"sled::Db")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("max_letters_per_topic", &self.max_letters_per_topic)
            .finish()
    }
}
