//! JSON codec backed by `serde_json`.

use crate::error::{CodecError, CodecResult};
use crate::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Content type advertised by [`JsonCodec`].
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Marshals payloads as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates a new JSON codec.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| CodecError::encoding_failed(JSON_CONTENT_TYPE, e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyPayload {
                content_type: JSON_CONTENT_TYPE,
            });
        }
        serde_json::from_slice(bytes)
            .map_err(|e| CodecError::decoding_failed(JSON_CONTENT_TYPE, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Greeting {
        name: String,
        times: u8,
    }

    #[test]
    fn marshal_is_compact() {
        let codec = JsonCodec::new();
        let bytes = codec
            .marshal(&Greeting {
                name: "ada".into(),
                times: 2,
            })
            .unwrap();
        assert_eq!(bytes, br#"{"name":"ada","times":2}"#);
    }

    #[test]
    fn unmarshal_reports_type_mismatch() {
        let codec = JsonCodec::new();
        let err = codec.unmarshal::<Greeting>(br#"{"name":3}"#).unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
        assert!(err.to_string().starts_with("application/json"));
    }
}
