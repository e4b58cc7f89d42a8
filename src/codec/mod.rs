//! Message codecs.
//!
//! A codec turns the generic `Message` envelope into the byte buffer the
//! transport carries and back. Brokers treat the output as opaque.

use crate::broker::Message;
use crate::utils::error::CodecError;

pub trait Codec: Send + Sync {
    fn marshal(&self, msg: &Message) -> Result<Vec<u8>, CodecError>;

    fn unmarshal(&self, data: &[u8]) -> Result<Message, CodecError>;

    fn name(&self) -> &'static str;
}

/// JSON envelope with base64 body; the default codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal(&self, msg: &Message) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(msg).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Message, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests;
