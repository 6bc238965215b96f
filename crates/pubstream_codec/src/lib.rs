//! # pubstream Codec
//!
//! Payload codecs for typed pubstream handlers.
//!
//! The streaming protocol itself only moves bytes. Typed clients, receivers
//! and handlers use a [`Codec`] to turn request and response values into
//! frame bodies, and tag each message with the codec's content type.
//!
//! ## Usage
//!
//! ```
//! use pubstream_codec::{Codec, JsonCodec};
//!
//! let codec = JsonCodec::new();
//! let bytes = codec.marshal(&vec![1u32, 2, 3]).unwrap();
//! let decoded: Vec<u32> = codec.unmarshal(&bytes).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;

pub use cbor::{CborCodec, CBOR_CONTENT_TYPE};
pub use error::{CodecError, CodecResult};
pub use json::{JsonCodec, JSON_CONTENT_TYPE};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Header carrying the content type of a marshalled payload.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// Marshals values to bytes and back.
///
/// Implementations must be stateless or internally synchronized: a single
/// codec is shared by every session of a typed client or handler.
pub trait Codec: Send + Sync {
    /// MIME type written to the `Content-Type` header.
    fn content_type(&self) -> &'static str;

    /// Encodes `value` to bytes.
    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>>;

    /// Decodes bytes into a value of type `T`.
    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn content_type(&self) -> &'static str {
        (**self).content_type()
    }

    fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        (**self).marshal(value)
    }

    fn unmarshal<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        (**self).unmarshal(bytes)
    }
}
