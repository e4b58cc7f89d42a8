use super::{Codec, JsonCodec};
use crate::broker::Message;
use crate::utils::error::CodecError;

#[test]
fn test_json_codec_wire_format() {
    let msg = Message::new(b"hi".to_vec()).with_header("id", "1");
    let data = JsonCodec.marshal(&msg).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
    assert_eq!(value["Header"]["id"], "1");
    assert_eq!(value["Body"], "aGk=");
}

#[test]
fn test_json_codec_decodes_go_envelope() {
    let data = br#"{"Header":{"Content-Type":"application/json"},"Body":"eyJhIjoxfQ=="}"#;
    let msg = JsonCodec.unmarshal(data).unwrap();
    assert_eq!(msg.body, br#"{"a":1}"#);
    assert_eq!(
        msg.header.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
}

#[test]
fn test_json_codec_accepts_null_body_and_missing_header() {
    let msg = JsonCodec.unmarshal(br#"{"Body":null}"#).unwrap();
    assert!(msg.body.is_empty());
    assert!(msg.header.is_empty());
}

#[test]
fn test_json_codec_rejects_malformed_payload() {
    let err = JsonCodec.unmarshal(b"not json at all").unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_json_codec_rejects_bad_base64() {
    let err = JsonCodec.unmarshal(br#"{"Body":"***"}"#).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_json_codec_name() {
    assert_eq!(JsonCodec.name(), "json");
}
