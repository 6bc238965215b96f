//! CBOR codec backed by `ciborium`.

use crate::error::{CodecError, CodecResult};
use crate::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Content type advertised by [`CborCodec`].
pub const CBOR_CONTENT_TYPE: &str = "application/cbor";

/// Marshals payloads as CBOR.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    /// Creates a new CBOR codec.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    fn content_type(&self) -> &'static str {
        CBOR_CONTENT_TYPE
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::into_writer(value, &mut out)
            .map_err(|e| CodecError::encoding_failed(CBOR_CONTENT_TYPE, e.to_string()))?;
        Ok(out)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        if bytes.is_empty() {
            return Err(CodecError::EmptyPayload {
                content_type: CBOR_CONTENT_TYPE,
            });
        }
        ciborium::from_reader(bytes)
            .map_err(|e| CodecError::decoding_failed(CBOR_CONTENT_TYPE, e.to_string()))
    }
}
