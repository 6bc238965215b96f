//! Error types for streaming sessions.

use pubstream_codec::CodecError;
use pubstream_protocol::ProtocolViolation;
use pubstream_transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// The step of the caller-side handshake a transport failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Subscribing to the reply address.
    SubscribeReply,
    /// Publishing the initiating request.
    PublishRequest,
    /// Subscribing to the session subject.
    SubscribeSession,
    /// Publishing the readiness confirmation.
    PublishReady,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::SubscribeReply => "subscribe reply inbox",
            Step::PublishRequest => "publish stream request",
            Step::SubscribeSession => "subscribe session subject",
            Step::PublishReady => "publish readiness confirmation",
        })
    }
}

/// Errors raised by stream clients and receivers.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A transport operation failed.
    #[error("{step}: {source}")]
    Transport {
        /// Handshake step that failed.
        step: Step,
        /// Underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// The peer broke the streaming protocol.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// A typed payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The caller's context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The subscription ended before the stream completed.
    #[error("subscription closed before the stream completed")]
    SubscriptionClosed,
}

impl StreamError {
    /// Wraps a transport failure with the step it occurred in.
    pub fn transport(step: Step, source: TransportError) -> Self {
        Self::Transport { step, source }
    }

    /// Returns the violation if this error is one.
    pub fn violation(&self) -> Option<&ProtocolViolation> {
        match self {
            StreamError::Protocol(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true for protocol violations.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, StreamError::Protocol(_))
    }

    /// Returns true if the caller's context ended the operation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled | StreamError::DeadlineExceeded)
    }

    /// Returns true for transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StreamError::Transport { .. } | StreamError::SubscriptionClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_names_step() {
        let err = StreamError::transport(Step::PublishRequest, TransportError::Closed);
        assert_eq!(err.to_string(), "publish stream request: transport closed");
        assert!(err.is_transport());
        assert!(!err.is_cancellation());
    }

    #[test]
    fn classification() {
        let err = StreamError::from(ProtocolViolation::MissingSequence);
        assert!(err.is_protocol_violation());
        assert_eq!(err.violation(), Some(&ProtocolViolation::MissingSequence));

        assert!(StreamError::Cancelled.is_cancellation());
        assert!(StreamError::DeadlineExceeded.is_cancellation());
        assert!(StreamError::DeadlineExceeded.violation().is_none());
    }
}
