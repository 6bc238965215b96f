//! Protocol violations.

use crate::frame::Control;
use thiserror::Error;

/// Result type for protocol checks.
pub type ProtocolResult<T> = Result<T, ProtocolViolation>;

/// A peer did not follow the streaming protocol.
///
/// Violations are distinct from transport failures: they mean the other side
/// (or something impersonating it) sent structurally invalid frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// The initiating request carried no reply address.
    #[error("reply subject missing")]
    MissingReplySubject,

    /// A frame carried a different or no correlation token.
    #[error("stream uid mismatch: expected {expected:?}, received {received:?}")]
    UidMismatch {
        /// Token of the session.
        expected: String,
        /// Token found on the frame.
        received: Option<String>,
    },

    /// A frame carried a control value not valid at this point.
    #[error("unexpected stream control {received:?}, expected {expected}")]
    UnexpectedControl {
        /// Control value required here.
        expected: Control,
        /// Raw control value found on the frame.
        received: Option<String>,
    },

    /// A data frame carried no sequence header.
    #[error("stream sequence missing")]
    MissingSequence,

    /// A sequence header was not a plain base-10 integer.
    #[error("malformed stream sequence {value:?}")]
    MalformedSequence {
        /// Raw header value.
        value: String,
    },

    /// A data frame arrived out of order, duplicated, or after a gap.
    #[error("out of order frame: expected sequence {expected}, received {received}")]
    OutOfOrder {
        /// Sequence the receiver expected.
        expected: u64,
        /// Sequence found on the frame.
        received: u64,
    },

    /// A control frame that must be empty carried a body.
    #[error("{control} frame carries {len} byte payload")]
    UnexpectedPayload {
        /// Role of the offending frame.
        control: Control,
        /// Payload length.
        len: usize,
    },

    /// The handshake ack did not carry a usable session subject.
    #[error("invalid session subject {value:?}")]
    InvalidSessionSubject {
        /// Raw ack body, lossily decoded.
        value: String,
    },

    /// A frame was published after the session had completed.
    #[error("stream already completed")]
    PublishAfterCompletion,

    /// A frame was published after the session had been aborted.
    #[error("stream already aborted")]
    PublishAfterAbort,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ProtocolViolation::OutOfOrder {
            expected: 0,
            received: 100,
        };
        assert!(err.to_string().contains("expected sequence 0"));
        assert!(err.to_string().contains("received 100"));

        let err = ProtocolViolation::UnexpectedPayload {
            control: Control::Done,
            len: 3,
        };
        assert_eq!(err.to_string(), "done frame carries 3 byte payload");

        assert_eq!(
            ProtocolViolation::MissingReplySubject.to_string(),
            "reply subject missing"
        );
    }
}
