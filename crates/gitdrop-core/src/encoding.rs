//! Content encoding between raw file bytes and the string forms carried by
//! the relay request and the blob API.

use crate::relay::ContentEncoding;

pub const BLOB_ENCODING: &str = "base64";

pub fn encode_blob(content: &[u8]) -> String {
    base64::encode(content)
}

pub fn decode_blob(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode(content)
}

/// Picks the relay representation for `content`: text stays text, anything
/// that is not valid UTF-8 travels as base64.
pub fn encode_for_relay(content: &[u8]) -> (String, ContentEncoding) {
    match std::str::from_utf8(content) {
        Ok(text) => (text.to_string(), ContentEncoding::Utf8),
        Err(_) => (encode_blob(content), ContentEncoding::Base64),
    }
}

pub fn decode_from_relay(
    content: &str,
    encoding: ContentEncoding,
) -> Result<Vec<u8>, base64::DecodeError> {
    match encoding {
        ContentEncoding::Utf8 => Ok(content.as_bytes().to_vec()),
        ContentEncoding::Base64 => decode_blob(content),
    }
}
