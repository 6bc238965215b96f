//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while marshalling or unmarshalling payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value.
    #[error("{content_type} encoding failed: {message}")]
    EncodingFailed {
        /// Content type of the codec that failed.
        content_type: &'static str,
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode bytes into a value.
    #[error("{content_type} decoding failed: {message}")]
    DecodingFailed {
        /// Content type of the codec that failed.
        content_type: &'static str,
        /// Description of the decoding error.
        message: String,
    },

    /// The payload was empty where a value was required.
    #[error("empty {content_type} payload")]
    EmptyPayload {
        /// Content type of the codec that rejected the payload.
        content_type: &'static str,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(content_type: &'static str, message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            content_type,
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(content_type: &'static str, message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            content_type,
            message: message.into(),
        }
    }

    /// Returns the content type of the codec that produced this error.
    pub fn content_type(&self) -> &'static str {
        match self {
            CodecError::EncodingFailed { content_type, .. }
            | CodecError::DecodingFailed { content_type, .. }
            | CodecError::EmptyPayload { content_type } => content_type,
        }
    }
}
