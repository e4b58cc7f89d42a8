use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The generic message envelope carried through any broker.
///
/// A message is a set of string headers plus an opaque body. Brokers never
/// look inside the body; the configured codec turns the whole envelope into
/// bytes for the transport and back.
///
/// The serialized field names (`Header`, `Body`) and the base64 body match
/// the envelope Go micro services put on the wire, so both sides can share
/// a channel.
///
/// # Example
///
/// ```rust
/// use stanbridge::broker::Message;
///
/// let msg = Message::new(b"hi".to_vec()).with_header("Content-Type", "text/plain");
/// assert_eq!(msg.body, b"hi");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Header", default)]
    pub header: HashMap<String, String>,

    #[serde(rename = "Body", default, with = "body_base64")]
    pub body: Vec<u8>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            header: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }
}

mod body_base64 {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(body))
    }

    // Go encodes a nil byte slice as `null`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => BASE64_STANDARD
                .decode(encoded.as_bytes())
                .map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
